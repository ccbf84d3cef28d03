// Label vocabulary: sentiment and category codes plus model label normalization
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate labels handed to the zero-shot classifier, in this order.
pub const CANDIDATE_LABELS: &[&str] = &[
    "UI",
    "Performance",
    "Feature",
    "Support",
    "Other",
    "Delivery",
    "Pricing",
    "Product quality",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Normalize a raw model label ("POSITIVE", "LABEL_2", "neg", ...).
    /// Returns `None` for labels that match none of the known spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("pos") || label.contains("positive") {
            Some(Sentiment::Positive)
        } else if label.contains("neg") || label.contains("negative") {
            Some(Sentiment::Negative)
        } else if label.contains("neu") || label.contains("neutral") {
            Some(Sentiment::Neutral)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ui,
    Performance,
    Feature,
    Support,
    Delivery,
    Pricing,
    ProductQuality,
    Other,
}

/// Normalized-label fragments checked in priority order. First hit wins.
const LABEL_TABLE: &[(&str, Category)] = &[
    ("ui", Category::Ui),
    ("performance", Category::Performance),
    ("feature", Category::Feature),
    ("support", Category::Support),
    ("delivery", Category::Delivery),
    ("pricing", Category::Pricing),
    ("product", Category::ProductQuality),
];

impl Category {
    /// Map a zero-shot label to a category code.
    ///
    /// The label is lower-cased and spaces become underscores before the
    /// table lookup, so "Product quality" lands on `product_quality`.
    /// Anything the table doesn't cover is `Other`.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.to_lowercase().replace(' ', "_");
        LABEL_TABLE
            .iter()
            .find(|(fragment, _)| normalized.contains(fragment))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ui => "ui",
            Category::Performance => "performance",
            Category::Feature => "feature",
            Category::Support => "support",
            Category::Delivery => "delivery",
            Category::Pricing => "pricing",
            Category::ProductQuality => "product_quality",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_label_case_insensitive() {
        for label in ["POSITIVE", "Positive", "pos", "positive"] {
            assert_eq!(Sentiment::from_label(label), Some(Sentiment::Positive));
        }
        for label in ["NEGATIVE", "Negative", "neg"] {
            assert_eq!(Sentiment::from_label(label), Some(Sentiment::Negative));
        }
        for label in ["NEUTRAL", "neu"] {
            assert_eq!(Sentiment::from_label(label), Some(Sentiment::Neutral));
        }
    }

    #[test]
    fn test_sentiment_unknown_label() {
        assert_eq!(Sentiment::from_label("LABEL_1"), None);
        assert_eq!(Sentiment::from_label(""), None);
    }

    #[test]
    fn test_category_candidate_labels() {
        let mapped: Vec<Category> = CANDIDATE_LABELS
            .iter()
            .map(|label| Category::from_label(label))
            .collect();
        assert_eq!(
            mapped,
            vec![
                Category::Ui,
                Category::Performance,
                Category::Feature,
                Category::Support,
                Category::Other,
                Category::Delivery,
                Category::Pricing,
                Category::ProductQuality,
            ]
        );
    }

    #[test]
    fn test_category_priority_order() {
        // "ui" is checked first, so any label containing it wins
        assert_eq!(Category::from_label("Build quality"), Category::Ui);
        assert_eq!(Category::from_label("Feature support"), Category::Feature);
        assert_eq!(Category::from_label("something else"), Category::Other);
    }

    #[test]
    fn test_serialized_codes() {
        assert_eq!(
            serde_json::to_string(&Category::ProductQuality).unwrap(),
            "\"product_quality\""
        );
        assert_eq!(serde_json::to_string(&Category::Ui).unwrap(), "\"ui\"");
        assert_eq!(
            serde_json::to_string(&Sentiment::Neutral).unwrap(),
            "\"neutral\""
        );
    }
}
