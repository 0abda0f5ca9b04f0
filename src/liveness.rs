//! Liveness probing
//!
//! The backend is hosted on a platform that suspends idle services; a GET on
//! its health endpoint both checks and wakes it. The probe itself never
//! retries and never fails: every outcome collapses to up or down.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::transport::HttpTransport;

/// Single-shot health check against one endpoint
#[derive(Clone)]
pub struct LivenessProber {
    transport: Arc<dyn HttpTransport>,
    health_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for LivenessProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessProber")
            .field("health_url", &self.health_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LivenessProber {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        health_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            health_url: health_url.into(),
            timeout,
        }
    }

    pub fn from_config(transport: Arc<dyn HttpTransport>, config: &RelayConfig) -> Self {
        Self::new(transport, config.health_url.clone(), config.health_timeout)
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` iff the endpoint answered with exactly 200.
    ///
    /// Non-200 statuses and transport failures (refused, timeout, DNS, TLS)
    /// all yield `false`.
    pub async fn probe(&self) -> bool {
        tracing::info!("Pinging health endpoint: {}", self.health_url);
        match self.transport.get(&self.health_url, self.timeout).await {
            Ok(response) => {
                tracing::debug!(
                    "Health endpoint response: {} {}",
                    response.status,
                    response.body
                );
                response.status == 200
            }
            Err(e) => {
                tracing::error!("Exception during health check: {}", e);
                false
            }
        }
    }
}
