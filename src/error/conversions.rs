//! Type Conversions for RelayError
//!
//! From implementations for the error types of the crates we sit on.

use super::types::RelayError;

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionError(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::StreamError(err.to_string())
        } else if let Some(status) = err.status() {
            Self::api_error(status.as_u16(), err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigurationError(format!("Invalid secrets file: {err}"))
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::TimeoutError(err.to_string()),
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::BrokenPipe => Self::ConnectionError(err.to_string()),
            _ => Self::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: RelayError = json_err.into();
        assert!(matches!(err, RelayError::JsonError(_)));
    }

    #[test]
    fn test_from_io_error_reset() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err: RelayError = io.into();
        assert_eq!(err, RelayError::ConnectionError("reset by peer".into()));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Table>("key = ").unwrap_err();
        let err: RelayError = toml_err.into();
        assert!(matches!(err, RelayError::ConfigurationError(_)));
    }
}
