// Keyword heuristics used when no zero-shot classifier answers
use crate::labels::Category;

const MAX_ISSUE_WORDS: usize = 6;
const MAX_ISSUE_CHARS: usize = 120;

/// Keyword sets per category, in priority order.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Ui, &["ui", "ux", "button", "layout", "design"]),
    (
        Category::Performance,
        &["slow", "lag", "performance", "crash", "loading"],
    ),
    (Category::Feature, &["feature", "missing", "add", "would like"]),
    (
        Category::Support,
        &["support", "agent", "customer service", "helpful"],
    ),
    (Category::Delivery, &["deliver", "delivery", "late", "tracking"]),
    (
        Category::Pricing,
        &["price", "pricing", "cost", "expensive", "refund"],
    ),
];

/// Categorize text by plain substring matching over the lower-cased input.
///
/// Categories are tried in a fixed order and the first one with any keyword
/// present wins. Matching is plain substring containment, so "build" counts for "ui".
pub fn categorize_by_keywords(text: &str) -> Category {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Crude issue summary: the first six words longer than two characters.
pub fn extract_issue(text: &str) -> String {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .take(MAX_ISSUE_WORDS)
        .collect();

    words.join(" ").chars().take(MAX_ISSUE_CHARS).collect()
}
