//! Core error types.

use thiserror::Error;

/// Coarse classification used for logging and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid configuration
    Configuration,
    /// Connection, DNS, TLS or timeout failures
    Network,
    /// 5xx responses
    Server,
    /// 4xx responses
    Client,
    /// Body could not be decoded
    Parsing,
    /// Backend did not wake up
    Availability,
    /// Bugs and invariant violations
    Internal,
}

/// Errors produced by the relay
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    /// Missing endpoint URL, API key, or an invalid setting
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Generic HTTP failure that could not be classified further
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success status returned by the remote API
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// Request exceeded its configured timeout
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Connection refused, reset, DNS or TLS failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failure while reading a streamed body
    #[error("Stream error: {0}")]
    StreamError(String),

    /// JSON serialization or deserialization failure
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Login rejected
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend stayed down for every revival attempt
    #[error("Server unavailable after {attempts} attempts")]
    ServerUnavailable { attempts: u32 },

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Build an [`RelayError::ApiError`]
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    /// Classify the error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
            Self::HttpError(_)
            | Self::TimeoutError(_)
            | Self::ConnectionError(_)
            | Self::StreamError(_) => ErrorCategory::Network,
            Self::ApiError { code, .. } if *code >= 500 => ErrorCategory::Server,
            Self::ApiError { .. } | Self::AuthenticationError(_) => ErrorCategory::Client,
            Self::JsonError(_) => ErrorCategory::Parsing,
            Self::ServerUnavailable { .. } => ErrorCategory::Availability,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether repeating the same request may succeed
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { code, .. } => *code >= 500 || *code == 429,
            Self::TimeoutError(_) | Self::ConnectionError(_) | Self::HttpError(_) => true,
            Self::StreamError(_) => true,
            _ => false,
        }
    }

    /// HTTP status code, when the error carries one
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }
}
