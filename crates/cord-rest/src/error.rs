//! REST error types

use thiserror::Error;

/// REST client errors
#[derive(Debug, Error)]
pub enum RestError {
    /// The request never got a response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A success response was not valid JSON
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A success response was empty where an object was expected
    #[error("Empty response body")]
    EmptyBody,
}

impl RestError {
    /// HTTP status of an API error
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// REST result type
pub type RestResult<T> = Result<T, RestError>;
