//! HTTP transport abstraction
//!
//! The relay talks to the backend only through [`HttpTransport`], so the
//! prober and the decoder can be driven by a scripted transport in tests and by
//! [`ReqwestTransport`] in production.

mod headers;
mod reqwest_transport;

pub use headers::HttpHeaderBuilder;
pub use reqwest_transport::ReqwestTransport;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::error::Result;
use crate::streaming::ByteStream;

/// A JSON POST whose response body is consumed as a stream
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
    /// Overall deadline covering connect, headers and the full body
    pub timeout: Duration,
}

/// Response head plus the not-yet-read body
pub struct TransportResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Buffered response of a GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStatus {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET with the given timeout and read the whole body; a body
    /// that fails or stalls mid-read is an error
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportStatus>;

    /// Issue a JSON POST and hand back the body as a byte stream
    async fn post_json_stream(&self, request: TransportRequest) -> Result<TransportResponse>;
}
