// Hub-backed pipelines - model metadata from the Hugging Face hub, inference over HTTP
use crate::config::Config;
use crate::error::{NlpError, NlpResult};
use crate::pipeline::{LabelScore, SentimentPipeline, ZeroShotOutput, ZeroShotPipeline};
use colored::Colorize;
use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::Cache;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

const MODEL_CONFIG_FILE: &str = "config.json";

/// Subset of a model's `config.json` we care about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelCard {
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl ModelCard {
    /// Replace generic `LABEL_n` names with the model's own label names
    pub fn rename(&self, label: &str) -> String {
        label
            .strip_prefix("LABEL_")
            .and_then(|idx| self.id2label.get(idx))
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

/// Shared handles for talking to the hub and the inference endpoint
pub struct HubClient {
    api: Api,
    http: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

impl HubClient {
    pub fn new(config: &Config) -> NlpResult<Self> {
        let cache = Cache::default();
        // Fall back to the `huggingface-cli login` token for inference calls too
        let token = config.api_token.clone().or_else(|| cache.token());
        let api = hub_api_builder(config, cache).build()?;

        // No timeout unless one is configured
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()?;

        Ok(Self {
            api,
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetch a model's config from the hub (or the local hub cache)
    pub fn resolve_model(&self, model_id: &str) -> NlpResult<ModelCard> {
        let path = self.api.model(model_id.to_string()).get(MODEL_CONFIG_FILE)?;
        let content = fs::read_to_string(&path)?;
        let card: ModelCard = serde_json::from_str(&content)?;
        debug!(
            "Resolved {} ({} labels, {})",
            model_id,
            card.id2label.len(),
            card.architectures.join(", ")
        );
        Ok(card)
    }

    fn model_url(&self, model_id: &str) -> String {
        format!("{}/{}", self.endpoint, model_id)
    }

    fn post(&self, model_id: &str, body: &Value) -> NlpResult<Value> {
        let mut request = self.http.post(self.model_url(model_id)).json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NlpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>()?)
    }
}

/// Hub API settings. A configured token overrides the one hf-hub reads from
/// its own token file; without one that file is left in effect.
fn hub_api_builder(config: &Config, cache: Cache) -> ApiBuilder {
    let builder = ApiBuilder::from_cache(cache).with_progress(false);
    match config.api_token {
        Some(ref token) => builder.with_token(Some(token.clone())),
        None => builder,
    }
}

pub struct HubSentimentPipeline {
    client: Rc<HubClient>,
    model_id: String,
    card: ModelCard,
}

impl HubSentimentPipeline {
    /// Resolve `model_id` on the hub; fails if the hub can't provide it
    pub fn load(client: Rc<HubClient>, model_id: &str) -> NlpResult<Self> {
        let card = client.resolve_model(model_id)?;
        Ok(Self {
            client,
            model_id: model_id.to_string(),
            card,
        })
    }
}

impl SentimentPipeline for HubSentimentPipeline {
    fn classify(&self, text: &str) -> NlpResult<Vec<LabelScore>> {
        let body = json!({
            "inputs": text,
            "parameters": { "truncation": true },
            "options": { "wait_for_model": true },
        });
        let value = self.client.post(&self.model_id, &body)?;

        let mut scores = parse_sentiment_response(value)?;
        for score in scores.iter_mut() {
            score.label = self.card.rename(&score.label);
        }
        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

pub struct HubZeroShotPipeline {
    client: Rc<HubClient>,
    model_id: String,
}

impl HubZeroShotPipeline {
    /// Resolve `model_id` on the hub; fails if the hub can't provide it
    pub fn load(client: Rc<HubClient>, model_id: &str) -> NlpResult<Self> {
        client.resolve_model(model_id)?;
        Ok(Self {
            client,
            model_id: model_id.to_string(),
        })
    }
}

impl ZeroShotPipeline for HubZeroShotPipeline {
    fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
        multi_label: bool,
    ) -> NlpResult<ZeroShotOutput> {
        let body = json!({
            "inputs": text,
            "parameters": {
                "candidate_labels": candidate_labels,
                "multi_label": multi_label,
            },
            "options": { "wait_for_model": true },
        });
        let value = self.client.post(&self.model_id, &body)?;
        parse_zero_shot_response(value)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Deserialize)]
struct RawLabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentimentResponse {
    Nested(Vec<Vec<RawLabelScore>>),
    Flat(Vec<RawLabelScore>),
}

/// Parse `[[{label, score}, ..]]` or `[{label, score}, ..]`, best score first
pub fn parse_sentiment_response(value: Value) -> NlpResult<Vec<LabelScore>> {
    let raw = match serde_json::from_value::<SentimentResponse>(value) {
        Ok(SentimentResponse::Nested(rows)) => rows.into_iter().next().unwrap_or_default(),
        Ok(SentimentResponse::Flat(row)) => row,
        Err(e) => {
            return Err(NlpError::MalformedResponse(format!(
                "unexpected sentiment payload: {}",
                e
            )))
        }
    };

    let mut scores: Vec<LabelScore> = raw
        .into_iter()
        .map(|r| LabelScore {
            label: r.label,
            score: r.score,
        })
        .collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}

#[derive(Debug, Default, Deserialize)]
struct RawZeroShot {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    scores: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Single(RawZeroShot),
    Batch(Vec<RawZeroShot>),
}

/// Parse `{sequence, labels, scores}` (or a one-element list of it)
pub fn parse_zero_shot_response(value: Value) -> NlpResult<ZeroShotOutput> {
    let raw = match serde_json::from_value::<ZeroShotResponse>(value) {
        Ok(ZeroShotResponse::Single(raw)) => raw,
        Ok(ZeroShotResponse::Batch(items)) => items.into_iter().next().unwrap_or_default(),
        Err(e) => {
            return Err(NlpError::MalformedResponse(format!(
                "unexpected zero-shot payload: {}",
                e
            )))
        }
    };

    Ok(ZeroShotOutput {
        labels: raw.labels,
        scores: raw.scores,
    })
}

/// Configured models by role
fn configured_models(config: &Config) -> Vec<(&'static str, &str)> {
    vec![
        ("sentiment", config.sentiment_model.as_str()),
        ("sentiment (default)", config.default_sentiment_model.as_str()),
        ("zero-shot", config.zero_shot_model.as_str()),
    ]
}

/// Whether a model's config is already in the local hub cache
pub fn is_cached(model_id: &str) -> bool {
    Cache::default()
        .model(model_id.to_string())
        .get(MODEL_CONFIG_FILE)
        .is_some()
}

/// List configured models with cache status
pub fn list_models(config: &Config) {
    println!("\nConfigured Models:\n");
    println!("{:<22} {:<12} Model", "Role", "Status");
    println!("{}", "-".repeat(80));

    for (role, model_id) in configured_models(config) {
        let status = if is_cached(model_id) {
            "cached".green()
        } else {
            "not cached".yellow()
        };
        println!("{:<22} {:<12} {}", role, status, model_id);
    }

    println!("\nInference endpoint: {}", config.endpoint);
    println!("\nCommands:");
    println!("  feedback-nlp models fetch  - Resolve all configured models into the hub cache");
}

/// Resolve every configured model, reporting each outcome. Returns how many failed.
pub fn fetch_models(config: &Config) -> anyhow::Result<usize> {
    let client = HubClient::new(config)?;
    let mut failed = 0;

    for (role, model_id) in configured_models(config) {
        match client.resolve_model(model_id) {
            Ok(card) => println!(
                "  {} {} ({}, {} labels)",
                "✓".green(),
                model_id,
                role,
                card.id2label.len()
            ),
            Err(e) => {
                failed += 1;
                println!("  {} {} ({}): {}", "✗".red(), model_id, role, e);
            }
        }
    }

    Ok(failed)
}
