// Inference pipeline seams: the analyzer only talks to these traits
use crate::error::NlpResult;

/// One scored label from a text-classification model
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Ranked output of a zero-shot classification call, best label first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZeroShotOutput {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl ZeroShotOutput {
    pub fn top_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn top_score(&self) -> Option<f64> {
        self.scores.first().copied()
    }
}

pub trait SentimentPipeline {
    /// Classify `text`, truncating it to the model's input limit.
    /// Results are ordered best first.
    fn classify(&self, text: &str) -> NlpResult<Vec<LabelScore>>;

    fn model_name(&self) -> &str;
}

pub trait ZeroShotPipeline {
    /// Rank `candidate_labels` against `text`. With `multi_label` false the
    /// scores are a single distribution over the candidates.
    fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        multi_label: bool,
    ) -> NlpResult<ZeroShotOutput>;

    fn model_name(&self) -> &str;
}
