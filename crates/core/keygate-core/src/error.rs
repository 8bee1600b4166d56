//! Backend error types.

use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The handshake cannot complete; the caller must restart it from
    /// `request_authentication`.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote key store already holds this key.
    #[error("Public key is already registered: {0}")]
    DuplicatePublicKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with unexpected status {status}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Content-Type of {url} is not application/json but {content_type}")]
    UnexpectedContentType { url: String, content_type: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication(reason.into())
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_duplicate_public_key(&self) -> bool {
        matches!(self, Self::DuplicatePublicKey(_))
    }
}
