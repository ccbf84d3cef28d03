// Machine-readable output: exactly one JSON object per invocation on stdout
use crate::analyzer::Classification;
use crate::labels::{Category, Sentiment};
use serde::Serialize;
use std::io::{self, Write};

/// The response contract callers parse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub sentiment: Sentiment,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl Response {
    /// `{"sentiment": "neutral", "category": "other"}`
    pub fn default_response() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            category: Category::Other,
            issue: None,
            error: None,
            trace: None,
        }
    }

    /// Default response annotated with why no backend could be used
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default_response()
        }
    }

    /// Default response for an unexpected failure during analysis
    pub fn failure(error: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            trace: Some(trace.into()),
            ..Self::default_response()
        }
    }
}

impl From<Classification> for Response {
    fn from(c: Classification) -> Self {
        Self {
            sentiment: c.sentiment,
            category: c.category,
            issue: Some(c.issue),
            error: None,
            trace: None,
        }
    }
}

/// Serialize `value` as a single line of JSON
pub fn to_line<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Write one JSON line to stdout. Serialization failures become an error object
/// so the caller still receives valid JSON.
pub fn emit<T: Serialize>(value: &T) {
    let line = to_line(value).unwrap_or_else(|e| {
        serde_json::json!({
            "sentiment": Sentiment::Neutral,
            "category": Category::Other,
            "error": e.to_string(),
        })
        .to_string()
    });

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Nothing sensible to do if stdout is gone
    let _ = writeln!(handle, "{}", line);
    let _ = handle.flush();
}
