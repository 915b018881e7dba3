use std::time::Duration;
use thiserror::Error;

/// Everything that can end a chat turn without an assistant message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{name} must be between {min} and {max}, got {value}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("{status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stream decode error: {0}")]
    Decode(String),

    #[error("malformed stream payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no response from upstream within {0:?}")]
    Timeout(Duration),

    #[error("stream ended before the response completed")]
    Interrupted,
}

impl ChatError {
    /// Status failures are shown as warnings; all other kinds as errors.
    pub fn is_warning(&self) -> bool {
        matches!(self, ChatError::Status { .. })
    }
}
