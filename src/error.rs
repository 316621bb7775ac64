use thiserror::Error;

#[derive(Error, Debug)]
pub enum DciLensError {
    #[error("DCI API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("DCI API error (status {status}) after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DciLensError>;
