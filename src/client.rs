//! Relay client
//!
//! Ties configuration, transport, liveness probing and the fragment decoder
//! together. [`RelayClient::stream_chat`] never returns an error: every
//! failure is folded into the returned [`FragmentStream`] as its final
//! `[Error: ...]` fragment.

use std::sync::Arc;
use std::time::Instant;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::liveness::LivenessProber;
use crate::revival::{RevivalObserver, RevivalPolicy, revive_server};
use crate::streaming::FragmentStream;
use crate::transport::{HttpHeaderBuilder, HttpTransport, ReqwestTransport, TransportRequest};
use crate::types::{ChatCompletionRequest, ChatMessage};

/// Client for the chat backend
#[derive(Clone)]
pub struct RelayClient {
    config: RelayConfig,
    transport: Arc<dyn HttpTransport>,
    prober: LivenessProber,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("chat_url", &self.config.chat_url)
            .field("health_url", &self.config.health_url)
            .field("model", &self.config.model)
            .field("stream_timeout", &self.config.stream_timeout)
            .field("has_api_key", &self.config.bearer_token().is_some())
            .finish()
    }
}

impl RelayClient {
    /// Create a client backed by `reqwest`
    pub fn new(config: RelayConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: RelayConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let prober = LivenessProber::from_config(transport.clone(), &config);
        Ok(Self {
            config,
            transport,
            prober,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn prober(&self) -> &LivenessProber {
        &self.prober
    }

    /// Single health probe
    pub async fn check_health(&self) -> bool {
        self.prober.probe().await
    }

    /// Probe the backend until it is up or `policy` is exhausted
    pub async fn revive(
        &self,
        policy: &RevivalPolicy,
        observer: &mut dyn RevivalObserver,
    ) -> Result<u32> {
        revive_server(&self.prober, policy, observer).await
    }

    /// Build the request payload for a transcript snapshot
    pub fn build_request(&self, messages: &[ChatMessage], system_prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::streaming(&self.config.model, messages, system_prompt)
    }

    /// Send the transcript and stream back the reply fragments
    pub async fn stream_chat(&self, messages: &[ChatMessage], system_prompt: &str) -> FragmentStream {
        let started = Instant::now();
        match self.open_stream(messages, system_prompt, started).await {
            Ok(stream) => stream,
            Err(e) => FragmentStream::failed(e).with_start(started),
        }
    }

    async fn open_stream(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        started: Instant,
    ) -> Result<FragmentStream> {
        let payload = self.build_request(messages, system_prompt);
        let body = serde_json::to_value(&payload)?;
        let headers = HttpHeaderBuilder::new()
            .with_optional_bearer_auth(self.config.bearer_token())?
            .with_json_content_type()
            .with_user_agent(concat!("ragchat/", env!("CARGO_PKG_VERSION")))?
            .build();

        tracing::info!("Sending chat request to: {}", self.config.chat_url);
        tracing::debug!("System prompt: {}", system_prompt);
        tracing::debug!("Payload: {}", body);

        let response = self
            .transport
            .post_json_stream(TransportRequest {
                url: self.config.chat_url.clone(),
                headers,
                body,
                timeout: self.config.stream_timeout,
            })
            .await?;

        tracing::info!("API response status: {}", response.status);

        let mut stream = FragmentStream::new(response.body).with_start(started);
        if !(200..300).contains(&response.status) {
            let reason = reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unexpected status");
            tracing::warn!("Chat endpoint returned {} {}", response.status, reason);
            stream = stream.with_status_error(RelayError::api_error(response.status, reason));
        }
        if let Some(limit) = self.config.max_pending_bytes {
            stream = stream.with_max_pending_bytes(limit);
        }
        Ok(stream)
    }
}
