//! Error types for plenty-rest
//!
//! Hard failures (transport, authentication, malformed responses) live here.
//! Server-reported errors travel as values instead, see
//! [`crate::types::ApiError`].

use thiserror::Error;

/// The main error type for plenty-rest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Authentication Errors
    // ============================================================================
    /// The login flow failed terminally
    #[error("Authentication failed: {message}")]
    Auth {
        /// What went wrong during login
        message: String,
    },

    /// The account was locked after repeated failed logins
    #[error("Account is locked, unlock at Setup->Settings->Accounts->{{user}}->unlock login")]
    AccountLocked,

    /// The login response was missing an expected field
    #[error("Malformed response, missing field '{field}'")]
    MalformedResponse {
        /// Name of the missing field
        field: String,
    },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    /// Transport-level request failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base url could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    /// A body could not be decoded as JSON
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A paginated response matched neither known response family
    #[error("Unknown pagination shape in response")]
    UnknownResponseShape,

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// The session configuration is unusable
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Local file or stream failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Anything that fits no other variant
    #[error("{0}")]
    Other(String),

    /// Failure propagated from an external collaborator
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a malformed response error for a missing field
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MalformedResponse {
            field: field.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error terminates the session (no usable partial session)
    pub fn is_terminal_auth(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. } | Error::AccountLocked | Error::MalformedResponse { .. }
        )
    }
}

/// Result type alias for plenty-rest
pub type Result<T> = std::result::Result<T, Error>;
