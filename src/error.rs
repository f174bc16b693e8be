use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Domoticz request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid device response for id {id}: expected 1 result, got {count}")]
    UnexpectedResultCount { id: String, count: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
