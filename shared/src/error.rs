//! Error types for the premium content Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lambda functions and their shared clients.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The token endpoint refused the client credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Outbound HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Secret already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status equivalent of this error, recorded when errors collapse into a fallback.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            Error::NotFound(_) => 404,
            Error::AlreadyExists(_) => 409,
            Error::Http(_) => 502,
            _ => 500,
        }
    }
}
