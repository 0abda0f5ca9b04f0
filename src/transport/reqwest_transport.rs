//! `reqwest`-backed transport

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::{HttpTransport, TransportRequest, TransportResponse, TransportStatus};
use crate::error::{RelayError, Result};

/// Production transport over a pooled `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportStatus> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportStatus { status, body })
    }

    async fn post_json_stream(&self, request: TransportRequest) -> Result<TransportResponse> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .json(&request.body)
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RelayError::from));

        Ok(TransportResponse {
            status,
            body: Box::pin(body),
        })
    }
}
