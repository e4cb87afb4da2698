//! Error types for the farm backend
//!
//! Every variant maps onto one client-facing `ResponseKey`. Infrastructure
//! variants keep their detail for the logs and only expose the kind.

use hyper::StatusCode;

use crate::types::ResponseKey;

/// Main error type for backend operations
#[derive(Debug, thiserror::Error)]
pub enum FarmError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Data not found: {0}")]
    DataNotFound(String),

    #[error("Wrong body: {0}")]
    WrongBody(String),

    #[error("Wrong method: {0}")]
    WrongMethod(String),

    #[error("Wrong data body: {0}")]
    WrongDataBody(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FarmError {
    /// Response key reported to clients
    pub fn response_key(&self) -> ResponseKey {
        match self {
            Self::Unauthorized(_) => ResponseKey::Unauthorized,
            Self::InvalidRequest(_) => ResponseKey::InvalidRequest,
            Self::DataNotFound(_) => ResponseKey::DataNotFound,
            Self::WrongBody(_) => ResponseKey::WrongBody,
            Self::WrongMethod(_) => ResponseKey::WrongMethod,
            Self::WrongDataBody(_) => ResponseKey::WrongDataBody,
            Self::Unknown(_)
            | Self::Database(_)
            | Self::Nats(_)
            | Self::Config(_)
            | Self::TokenSigning(_)
            | Self::Internal(_) => ResponseKey::UnknownError,
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_)
            | Self::DataNotFound(_)
            | Self::WrongBody(_)
            | Self::WrongMethod(_)
            | Self::WrongDataBody(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Nats(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unknown(_) | Self::Config(_) | Self::TokenSigning(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Client-input errors carry their message; infrastructure errors and
    /// authentication failures are reduced to an empty string.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(m)
            | Self::DataNotFound(m)
            | Self::WrongBody(m)
            | Self::WrongMethod(m)
            | Self::WrongDataBody(m) => m.clone(),
            _ => String::new(),
        }
    }

    /// Whether this error came from our own infrastructure rather than the caller
    pub fn is_internal(&self) -> bool {
        self.response_key() == ResponseKey::UnknownError
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for FarmError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for FarmError {
    fn from(err: serde_json::Error) -> Self {
        Self::WrongDataBody(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for FarmError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for FarmError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for FarmError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for FarmError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(String::new())
    }
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, FarmError>;
