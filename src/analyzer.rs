// Analyzer - owns the loaded pipelines and turns feedback text into a classification
use crate::config::{Config, SentimentFallback};
use crate::heuristics::{categorize_by_keywords, extract_issue};
use crate::hub::{HubClient, HubSentimentPipeline, HubZeroShotPipeline};
use crate::labels::{Category, Sentiment, CANDIDATE_LABELS};
use crate::lexicon;
use crate::pipeline::{SentimentPipeline, ZeroShotPipeline};
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Confidence reported when nothing scored the text
const NO_SIGNAL_SCORE: f64 = 0.5;

/// Classification of one piece of feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    /// Confidence of `sentiment`, from the model or the lexicon
    pub score: f64,
    pub category: Category,
    pub issue: String,
}

/// Process-wide inference context. Built once, then used for every text.
pub struct Analyzer {
    sentiment: Option<Box<dyn SentimentPipeline>>,
    zero_shot: Option<Box<dyn ZeroShotPipeline>>,
    fallback: SentimentFallback,
}

impl Analyzer {
    pub fn new(
        sentiment: Option<Box<dyn SentimentPipeline>>,
        zero_shot: Option<Box<dyn ZeroShotPipeline>>,
        fallback: SentimentFallback,
    ) -> Self {
        Self {
            sentiment,
            zero_shot,
            fallback,
        }
    }

    /// Heuristics only, no model backends
    pub fn offline(fallback: SentimentFallback) -> Self {
        Self::new(None, None, fallback)
    }

    /// Load pipelines from the hub.
    ///
    /// Only failing to build the hub client itself is an error. Each model
    /// that fails to resolve is logged and skipped: the preferred sentiment
    /// model falls back to the default one, and a missing zero-shot model
    /// leaves category inference to the keyword heuristics.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        if config.offline {
            info!("Offline mode: using heuristics only");
            return Ok(Self::offline(config.sentiment_fallback));
        }

        let client = Rc::new(HubClient::new(config)?);

        let sentiment = load_sentiment(&client, config);
        let zero_shot: Option<Box<dyn ZeroShotPipeline>> =
            match HubZeroShotPipeline::load(Rc::clone(&client), &config.zero_shot_model) {
                Ok(pipeline) => Some(Box::new(pipeline)),
                Err(e) => {
                    warn!(
                        "Zero-shot model {} unavailable, using keyword heuristics: {}",
                        config.zero_shot_model, e
                    );
                    None
                }
            };

        Ok(Self::new(sentiment, zero_shot, config.sentiment_fallback))
    }

    pub fn backend_name(&self) -> String {
        let sentiment = self
            .sentiment
            .as_ref()
            .map(|p| p.model_name().to_string())
            .unwrap_or_else(|| "none".to_string());
        let zero_shot = self
            .zero_shot
            .as_ref()
            .map(|p| p.model_name().to_string())
            .unwrap_or_else(|| "keywords".to_string());
        format!("sentiment: {}, category: {}", sentiment, zero_shot)
    }

    /// Classify one text. Infallible: every backend failure degrades to a default.
    pub fn analyze(&self, text: &str) -> Classification {
        let issue = if text.is_empty() {
            String::new()
        } else {
            extract_issue(text)
        };

        let (sentiment, score) = self.sentiment(text);
        Classification {
            sentiment,
            score,
            category: self.category(text),
            issue,
        }
    }

    /// Sentiment with its confidence score
    pub fn sentiment(&self, text: &str) -> (Sentiment, f64) {
        if let Some(ref pipeline) = self.sentiment {
            match pipeline.classify(text) {
                Ok(scores) => {
                    let Some(top) = scores.first() else {
                        return (Sentiment::Neutral, NO_SIGNAL_SCORE);
                    };
                    // A model that answered is trusted over the lexicon
                    let sentiment = Sentiment::from_label(&top.label).unwrap_or_else(|| {
                        debug!("Unrecognized sentiment label: {}", top.label);
                        Sentiment::Neutral
                    });
                    return (sentiment, top.score);
                }
                Err(e) => warn!("Sentiment inference failed: {}", e),
            }
        }

        match self.fallback {
            SentimentFallback::Neutral => (Sentiment::Neutral, NO_SIGNAL_SCORE),
            SentimentFallback::Lexicon => {
                let scored = lexicon::score(text);
                debug!("Lexicon sentiment: {} ({:.2})", scored.sentiment, scored.score);
                (scored.sentiment, scored.score)
            }
        }
    }

    pub fn category(&self, text: &str) -> Category {
        if let Some(ref pipeline) = self.zero_shot {
            match pipeline.classify(text, CANDIDATE_LABELS, false) {
                Ok(output) => {
                    if let Some(label) = output.top_label().filter(|l| !l.is_empty()) {
                        debug!(
                            "Zero-shot top label: {} ({:.2})",
                            label,
                            output.top_score().unwrap_or_default()
                        );
                        return Category::from_label(label);
                    }
                    debug!("Zero-shot classifier returned no label");
                }
                Err(e) => warn!("Zero-shot inference failed: {}", e),
            }
        }

        categorize_by_keywords(text)
    }
}

fn load_sentiment(client: &Rc<HubClient>, config: &Config) -> Option<Box<dyn SentimentPipeline>> {
    let preferred = HubSentimentPipeline::load(Rc::clone(client), &config.sentiment_model);
    let pipeline = match preferred {
        Ok(pipeline) => pipeline,
        Err(e) => {
            warn!(
                "Sentiment model {} unavailable, trying {}: {}",
                config.sentiment_model, config.default_sentiment_model, e
            );
            match HubSentimentPipeline::load(Rc::clone(client), &config.default_sentiment_model) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    warn!("No sentiment model available: {}", e);
                    return None;
                }
            }
        }
    };

    debug!("Sentiment model: {}", pipeline.model_name());
    Some(Box::new(pipeline))
}
