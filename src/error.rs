// Error types for model resolution and inference calls
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlpError {
    #[error("Hub error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Inference endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NlpResult<T> = std::result::Result<T, NlpError>;
