// Configuration management module
// Defaults, then the JSON config file, then environment, then command-line flags

use anyhow::{anyhow, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_SENTIMENT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const FALLBACK_SENTIMENT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";
pub const DEFAULT_ZERO_SHOT_MODEL: &str = "facebook/bart-large-mnli";

const ENV_ENDPOINT: &str = "FEEDBACK_NLP_ENDPOINT";
const ENV_OFFLINE: &str = "FEEDBACK_NLP_OFFLINE";
const ENV_TOKEN: &str = "HF_TOKEN";

/// What to report when no sentiment model produced a usable label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SentimentFallback {
    #[default]
    Neutral,
    Lexicon,
}

impl SentimentFallback {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "neutral" => Ok(SentimentFallback::Neutral),
            "lexicon" | "keywords" => Ok(SentimentFallback::Lexicon),
            _ => Err(anyhow!(
                "Unknown sentiment fallback: {}. Supported: neutral, lexicon",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inference endpoint; the model id is appended
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub sentiment_model: String,
    pub default_sentiment_model: String,
    pub zero_shot_model: String,
    /// Skip every model backend and answer from heuristics alone
    pub offline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub sentiment_fallback: SentimentFallback,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            default_sentiment_model: FALLBACK_SENTIMENT_MODEL.to_string(),
            zero_shot_model: DEFAULT_ZERO_SHOT_MODEL.to_string(),
            offline: false,
            timeout_secs: None,
            sentiment_fallback: SentimentFallback::Neutral,
        }
    }
}

/// Command-line values that take precedence over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub sentiment_model: Option<String>,
    pub zero_shot_model: Option<String>,
    pub sentiment_fallback: Option<SentimentFallback>,
    pub offline: bool,
}

impl Config {
    /// Build the effective configuration. Never fails: a missing or broken
    /// config file falls back to defaults with a warning.
    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_file_path);

        let mut config = match Self::load_from(&path) {
            Ok(Some(config)) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        config
    }

    /// Load configuration from a file, `None` if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(Some(config))
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedback-nlp")
            .join("config.json")
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(offline) = lookup(ENV_OFFLINE) {
            self.offline = matches!(offline.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.api_token = Some(token);
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(ref endpoint) = overrides.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(ref model) = overrides.sentiment_model {
            self.sentiment_model = model.clone();
        }
        if let Some(ref model) = overrides.zero_shot_model {
            self.zero_shot_model = model.clone();
        }
        if let Some(fallback) = overrides.sentiment_fallback {
            self.sentiment_fallback = fallback;
        }
        if overrides.offline {
            self.offline = true;
        }
    }

    /// Mask the API token for display
    pub fn masked_token(&self) -> String {
        match self.api_token.as_deref() {
            None => "(none)".to_string(),
            Some(token) => {
                let chars: Vec<char> = token.chars().collect();
                if chars.len() <= 8 {
                    "*".repeat(chars.len())
                } else {
                    let head: String = chars[..4].iter().collect();
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("{}...{}", head, tail)
                }
            }
        }
    }

    /// Print the effective configuration
    pub fn show(&self) {
        println!("\n{}", "Current Configuration:".bold().cyan());
        println!("  {}: {}", "Endpoint".bold(), self.endpoint);
        println!("  {}: {}", "API Token".bold(), self.masked_token());
        println!("  {}: {}", "Sentiment Model".bold(), self.sentiment_model);
        println!(
            "  {}: {}",
            "Default Sentiment Model".bold(),
            self.default_sentiment_model
        );
        println!("  {}: {}", "Zero-shot Model".bold(), self.zero_shot_model);
        println!("  {}: {}", "Offline".bold(), self.offline);
        println!(
            "  {}: {:?}",
            "Sentiment Fallback".bold(),
            self.sentiment_fallback
        );
        if let Some(secs) = self.timeout_secs {
            println!("  {}: {}s", "Timeout".bold(), secs);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.sentiment_model, DEFAULT_SENTIMENT_MODEL);
        assert_eq!(config.zero_shot_model, DEFAULT_ZERO_SHOT_MODEL);
        assert!(!config.offline);
        assert_eq!(config.sentiment_fallback, SentimentFallback::Neutral);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"zero_shot_model": "org/other-mnli", "sentiment_fallback": "lexicon"}"#)
            .unwrap();

        let config = Config::load_from(&path).unwrap().unwrap();
        assert_eq!(config.zero_shot_model, "org/other-mnli");
        assert_eq!(config.sentiment_model, DEFAULT_SENTIMENT_MODEL);
        assert_eq!(config.sentiment_fallback, SentimentFallback::Lexicon);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.timeout_secs = Some(30);
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("nope.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let overrides = Overrides {
            offline: true,
            ..Default::default()
        };
        let config = Config::resolve(Some(&path), &overrides);
        assert_eq!(config.sentiment_model, DEFAULT_SENTIMENT_MODEL);
        assert!(config.offline);
    }

    #[test]
    fn test_env_then_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ENDPOINT, "http://localhost:8080/models"),
            (ENV_OFFLINE, "true"),
            (ENV_TOKEN, "hf_abcdefghijkl"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.endpoint, "http://localhost:8080/models");
        assert!(config.offline);
        assert_eq!(config.api_token.as_deref(), Some("hf_abcdefghijkl"));

        config.apply_overrides(&Overrides {
            endpoint: Some("http://127.0.0.1:9000".to_string()),
            sentiment_model: Some("org/sentiment".to_string()),
            sentiment_fallback: Some(SentimentFallback::Lexicon),
            ..Default::default()
        });
        assert_eq!(config.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.sentiment_fallback, SentimentFallback::Lexicon);
        assert_eq!(config.sentiment_model, "org/sentiment");
        assert_eq!(config.zero_shot_model, DEFAULT_ZERO_SHOT_MODEL);
    }

    #[test]
    fn test_masked_token() {
        let mut config = Config::default();
        assert_eq!(config.masked_token(), "(none)");
        config.api_token = Some("short".to_string());
        assert_eq!(config.masked_token(), "*****");
        config.api_token = Some("hf_abcdefghijkl".to_string());
        assert_eq!(config.masked_token(), "hf_a...ijkl");
    }

    #[test]
    fn test_sentiment_fallback_from_str() {
        assert_eq!(
            SentimentFallback::from_str("Lexicon").unwrap(),
            SentimentFallback::Lexicon
        );
        assert_eq!(
            SentimentFallback::from_str("neutral").unwrap(),
            SentimentFallback::Neutral
        );
        assert!(SentimentFallback::from_str("magic").is_err());
    }
}
