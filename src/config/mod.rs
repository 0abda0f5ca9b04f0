//! Relay Configuration
//!
//! Endpoint URLs, the API key, timeouts and login credentials, loaded from a
//! [`SecretsProvider`]. A missing chat URL or API key is fatal before any
//! request is made.

mod secrets;

pub use secrets::{EnvSecrets, LayeredSecrets, MapSecrets, SecretsProvider, TomlSecrets};

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{RelayError, Result};
use crate::types::ChatCompletionRequest;

/// Secret keys understood by [`RelayConfig::from_secrets`]
pub mod keys {
    pub const API_URL: &str = "LIGHTRAG_API_URL";
    pub const API_KEY: &str = "LIGHTRAG_API_KEY";
    pub const MODEL: &str = "LIGHTRAG_MODEL";
    pub const HEALTH_URL: &str = "HEALTH_URL";
    pub const HEALTH_PING_TIMEOUT_SEC: &str = "HEALTH_PING_TIMEOUT_SEC";
    pub const STREAM_RESPONSE_TIMEOUT_SEC: &str = "STREAM_RESPONSE_TIMEOUT_SEC";
    pub const MAX_PENDING_BYTES: &str = "STREAM_MAX_PENDING_BYTES";
    pub const LOGIN_USERNAME: &str = "LOGIN_USERNAME";
    pub const LOGIN_PASSWORD: &str = "LOGIN_PASSWORD";
}

/// Username/password pair for the login gate
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Plain equality on both fields
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password.expose_secret() == password
    }
}

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Chat completion endpoint
    pub chat_url: String,
    /// Bearer token for the chat endpoint (securely stored)
    pub api_key: SecretString,
    /// Health-check endpoint used to wake the backend
    pub health_url: String,
    pub health_timeout: Duration,
    /// Overall timeout of one streamed chat request
    pub stream_timeout: Duration,
    pub model: String,
    /// Give up on a stream once this many bytes are pending without a
    /// complete document
    pub max_pending_bytes: Option<usize>,
    /// Login credentials; without them every login attempt is rejected
    pub credentials: Option<Credentials>,
}

impl RelayConfig {
    pub const DEFAULT_HEALTH_URL: &'static str = "https://neuraura-lightrag.onrender.com/health";
    pub const DEFAULT_HEALTH_TIMEOUT_SECS: i64 = 180;
    pub const DEFAULT_STREAM_TIMEOUT_SECS: i64 = 120;

    /// Create a configuration with default health endpoint and timeouts
    pub fn new(chat_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            chat_url: chat_url.into(),
            api_key: SecretString::from(api_key.into()),
            health_url: Self::DEFAULT_HEALTH_URL.to_string(),
            health_timeout: Duration::from_secs(Self::DEFAULT_HEALTH_TIMEOUT_SECS as u64),
            stream_timeout: Duration::from_secs(Self::DEFAULT_STREAM_TIMEOUT_SECS as u64),
            model: ChatCompletionRequest::DEFAULT_MODEL.to_string(),
            max_pending_bytes: None,
            credentials: None,
        }
    }

    /// Load from a secrets provider and validate
    pub fn from_secrets(secrets: &dyn SecretsProvider) -> Result<Self> {
        let chat_url = secrets
            .get_string(keys::API_URL)
            .filter(|v| !v.trim().is_empty());
        let api_key = secrets
            .get_string(keys::API_KEY)
            .filter(|v| !v.trim().is_empty());

        let (chat_url, api_key) = match (chat_url, api_key) {
            (Some(url), Some(key)) => (url, key),
            (url, key) => {
                let missing: Vec<&str> = [
                    url.is_none().then_some(keys::API_URL),
                    key.is_none().then_some(keys::API_KEY),
                ]
                .into_iter()
                .flatten()
                .collect();
                return Err(RelayError::ConfigurationError(format!(
                    "Missing required secrets: {}",
                    missing.join(", ")
                )));
            }
        };

        let health_timeout = positive_secs(
            keys::HEALTH_PING_TIMEOUT_SEC,
            secrets.get_int_or(
                keys::HEALTH_PING_TIMEOUT_SEC,
                Self::DEFAULT_HEALTH_TIMEOUT_SECS,
            )?,
        )?;
        let stream_timeout = positive_secs(
            keys::STREAM_RESPONSE_TIMEOUT_SEC,
            secrets.get_int_or(
                keys::STREAM_RESPONSE_TIMEOUT_SEC,
                Self::DEFAULT_STREAM_TIMEOUT_SECS,
            )?,
        )?;

        let max_pending_bytes = match secrets.get_int(keys::MAX_PENDING_BYTES)? {
            Some(limit) if limit > 0 => Some(limit as usize),
            Some(limit) => {
                return Err(RelayError::ConfigurationError(format!(
                    "{} must be positive, got {limit}",
                    keys::MAX_PENDING_BYTES
                )));
            }
            None => None,
        };

        let credentials = match (
            secrets.get_string(keys::LOGIN_USERNAME),
            secrets.get_string(keys::LOGIN_PASSWORD),
        ) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };

        let config = Self {
            chat_url,
            api_key: SecretString::from(api_key),
            health_url: secrets.get_string_or(keys::HEALTH_URL, Self::DEFAULT_HEALTH_URL),
            health_timeout,
            stream_timeout,
            model: secrets.get_string_or(keys::MODEL, ChatCompletionRequest::DEFAULT_MODEL),
            max_pending_bytes,
            credentials,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = url.into();
        self
    }

    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub const fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub const fn with_max_pending_bytes(mut self, limit: usize) -> Self {
        self.max_pending_bytes = Some(limit);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Bearer token, if one is configured
    pub fn bearer_token(&self) -> Option<&str> {
        let key = self.api_key.expose_secret();
        (!key.is_empty()).then_some(key)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            (keys::API_URL, &self.chat_url),
            (keys::HEALTH_URL, &self.health_url),
        ] {
            if url.is_empty() {
                return Err(RelayError::ConfigurationError(format!(
                    "{name} cannot be empty"
                )));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RelayError::ConfigurationError(format!(
                    "{name} must start with http:// or https:// (got {url})"
                )));
            }
        }

        if self.api_key.expose_secret().is_empty() {
            return Err(RelayError::ConfigurationError(
                "API key cannot be empty".to_string(),
            ));
        }

        if self.health_timeout.is_zero() || self.stream_timeout.is_zero() {
            return Err(RelayError::ConfigurationError(
                "Timeouts must be positive".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(RelayError::ConfigurationError(
                "Model cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn positive_secs(key: &str, secs: i64) -> Result<Duration> {
    if secs <= 0 {
        return Err(RelayError::ConfigurationError(format!(
            "{key} must be positive, got {secs}"
        )));
    }
    Ok(Duration::from_secs(secs as u64))
}
