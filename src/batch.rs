// Batch analysis - classify many feedback entries and summarize recurring issues
use crate::analyzer::{Analyzer, Classification};
use crate::labels::{Category, Sentiment};
use anyhow::{anyhow, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const MAX_TOP_ISSUES: usize = 5;
const MAX_SUGGESTIONS: usize = 3;

/// Header words that mark a spreadsheet column as the feedback text
const FEEDBACK_COLUMN_KEYWORDS: &[&str] = &[
    "feedback",
    "comment",
    "review",
    "opinion",
    "message",
    "text",
    "description",
    "note",
    "remarks",
    "response",
];

/// Issue themes counted over negative feedback, with the keywords that signal
/// them and the suggestion offered when they rank.
const ISSUE_THEMES: &[(&str, &[&str], &str)] = &[
    (
        "Customer Service",
        &[
            "service", "staff", "support", "employee", "representative", "help", "rude",
            "unhelpful", "customer", "agent",
        ],
        "Invest in comprehensive customer service training and expand support team capacity to reduce response times",
    ),
    (
        "Product Quality",
        &[
            "quality", "broken", "defective", "damaged", "poor", "cheap", "faulty",
            "durability", "materials",
        ],
        "Implement rigorous quality control processes and conduct regular product testing before release",
    ),
    (
        "Delivery & Shipping",
        &[
            "delivery", "shipping", "late", "delayed", "arrive", "received", "package",
            "tracking", "carrier",
        ],
        "Partner with reliable logistics providers and implement real-time tracking systems for transparency",
    ),
    (
        "Pricing",
        &[
            "price", "expensive", "cost", "overpriced", "value", "money", "refund", "charge",
        ],
        "Review pricing strategy to ensure competitive positioning and communicate value proposition more clearly",
    ),
    (
        "User Experience",
        &[
            "difficult", "confusing", "complicated", "hard", "interface", "use", "navigate",
            "unintuitive",
        ],
        "Conduct usability testing with real users and redesign interface based on feedback for intuitive navigation",
    ),
    (
        "Performance",
        &[
            "slow", "crash", "bug", "error", "freeze", "lag", "glitch", "loading", "speed",
        ],
        "Optimize code and infrastructure for faster performance and establish regular maintenance schedules",
    ),
    (
        "Features",
        &[
            "missing", "lack", "limited", "feature", "functionality", "options", "capability",
        ],
        "Prioritize feature development based on user requests and communicate product roadmap transparently",
    ),
];

#[derive(Debug, Deserialize)]
struct BatchRequest {
    #[serde(default)]
    feedbacks: Vec<String>,
}

/// Feedback entries to analyze, and the CSV column they came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInput {
    pub feedbacks: Vec<String>,
    pub detected_column: Option<String>,
}

impl From<Vec<String>> for BatchInput {
    fn from(feedbacks: Vec<String>) -> Self {
        Self {
            feedbacks,
            detected_column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackResult {
    pub text: String,
    pub sentiment: Sentiment,
    pub score: f64,
    pub category: Category,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCount {
    pub issue: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_column: Option<String>,
    pub total: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub top_issues: Vec<IssueCount>,
    pub suggestions: Vec<String>,
    pub feedbacks: Vec<FeedbackResult>,
}

/// Parse a `{"feedbacks": [...]}` body
pub fn parse_json(raw: &str) -> Result<BatchInput> {
    let request: BatchRequest = serde_json::from_str(raw)
        .map_err(|e| anyhow!("Invalid batch request: {}", e))?;
    Ok(request.feedbacks.into())
}

/// Read a `.csv` export by its feedback column, any other file one entry per line
pub fn read_file(path: &Path) -> Result<BatchInput> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let file = fs::File::open(path)
            .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
        return read_csv(file);
    }
    read_lines(path).map(BatchInput::from)
}

/// Read one feedback entry per line
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Read CSV with a header row and keep the non-blank cells of the feedback column
pub fn read_csv<R: Read>(reader: R) -> Result<BatchInput> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<StringRecord>, csv::Error>>()?;
    if rows.is_empty() {
        return Err(anyhow!("File is empty"));
    }

    let column = detect_feedback_column(&headers, &rows)
        .ok_or_else(|| anyhow!("Could not detect feedback column"))?;
    let name = headers.get(column).unwrap_or_default().to_string();
    debug!("Feedback column: {} (#{})", name, column);

    let feedbacks: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|cell| !cell.trim().is_empty())
        .map(str::to_string)
        .collect();
    if feedbacks.is_empty() {
        return Err(anyhow!("No valid feedbacks found in column {}", name));
    }

    Ok(BatchInput {
        feedbacks,
        detected_column: Some(name),
    })
}

/// Pick the column holding feedback text: the first header naming a feedback
/// keyword, else the column with the longest text on average.
pub fn detect_feedback_column(headers: &StringRecord, rows: &[StringRecord]) -> Option<usize> {
    if headers.is_empty() {
        return None;
    }

    let by_name = headers.iter().position(|header| {
        let lower = header.to_lowercase();
        FEEDBACK_COLUMN_KEYWORDS.iter().any(|k| lower.contains(k))
    });
    if by_name.is_some() {
        return by_name;
    }

    // Every column averages over the same row count, so compare totals; ties keep the earlier column
    let text_length = |column: usize| -> usize {
        rows.iter()
            .map(|row| row.get(column).unwrap_or_default().chars().count())
            .sum()
    };
    let mut best = 0;
    let mut best_length = 0;
    for column in 0..headers.len() {
        let length = text_length(column);
        if length > best_length {
            best = column;
            best_length = length;
        }
    }
    Some(best)
}

/// Classify every non-blank entry and build the summary report
pub fn analyze_all(analyzer: &Analyzer, input: &BatchInput) -> BatchReport {
    let feedbacks: Vec<FeedbackResult> = input
        .feedbacks
        .iter()
        .map(|entry| entry.trim())
        .filter(|text| !text.is_empty())
        .map(|text| {
            let Classification {
                sentiment,
                score,
                category,
                issue,
            } = analyzer.analyze(text);
            FeedbackResult {
                text: text.to_string(),
                sentiment,
                score,
                category,
                issue,
            }
        })
        .collect();

    info!("Analyzed {} feedback entries", feedbacks.len());

    let count = |s: Sentiment| feedbacks.iter().filter(|f| f.sentiment == s).count();
    let top_issues = top_issues(&feedbacks);
    let suggestions = suggestions(&top_issues);

    BatchReport {
        detected_column: input.detected_column.clone(),
        total: feedbacks.len(),
        positive: count(Sentiment::Positive),
        neutral: count(Sentiment::Neutral),
        negative: count(Sentiment::Negative),
        top_issues,
        suggestions,
        feedbacks,
    }
}

/// Count issue themes across negative feedback, most frequent first
pub fn top_issues(feedbacks: &[FeedbackResult]) -> Vec<IssueCount> {
    let mut counts: Vec<IssueCount> = ISSUE_THEMES
        .iter()
        .map(|(theme, keywords, _)| IssueCount {
            issue: theme.to_string(),
            count: feedbacks
                .iter()
                .filter(|f| f.sentiment == Sentiment::Negative)
                .filter(|f| {
                    let lower = f.text.to_lowercase();
                    keywords.iter().any(|k| lower.contains(k))
                })
                .count(),
        })
        .filter(|c| c.count > 0)
        .collect();

    // Stable sort keeps theme order for ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(MAX_TOP_ISSUES);
    counts
}

pub fn suggestions(top_issues: &[IssueCount]) -> Vec<String> {
    top_issues
        .iter()
        .filter_map(|issue| {
            ISSUE_THEMES
                .iter()
                .find(|(theme, _, _)| *theme == issue.issue)
                .map(|(_, _, suggestion)| suggestion.to_string())
        })
        .take(MAX_SUGGESTIONS)
        .collect()
}
