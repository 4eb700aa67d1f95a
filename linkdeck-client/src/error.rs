//! Error types for the client.

use crate::config::ConfigError;
use linkdeck_api::ErrorCode;
use linkdeck_core::LinkdeckError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("{code}: {message}")]
    Api { code: ErrorCode, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// A local optimistic apply was rejected before any request was sent.
    #[error("Rejected locally: {0}")]
    Rejected(#[from] LinkdeckError),

    /// The store has not loaded a snapshot yet.
    #[error("No snapshot loaded for list '{0}'")]
    NotLoaded(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl From<linkdeck_api::ApiError> for ClientError {
    fn from(err: linkdeck_api::ApiError) -> Self {
        Self::Api {
            code: err.code,
            message: err.message,
        }
    }
}

impl ClientError {
    /// Server error code, when the failure came from an error envelope.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
