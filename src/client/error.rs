//! Client error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the backend for any non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

/// Errors talking to the panel backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// Backend rejected the request with an error body
    #[error("API error {}: {}", .0.code, .0.message)]
    Api(ApiError),

    /// Missing, expired or invalid token (HTTP 403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Refused client-side before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status code carried by the error, when there is one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Api(err) => Some(err.code),
            ClientError::Unauthorized(_) => Some(403),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
