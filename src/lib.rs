//! # ragchat - A streaming chat relay for LightRAG backends
//!
//! ragchat forwards a chat transcript to a LightRAG (Ollama-compatible) chat
//! endpoint and relays the streamed reply back as text fragments.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Liveness probing**: a single health GET with a generous timeout, plus a
//!   bounded revival loop that wakes a sleeping backend before chatting.
//! - **Incremental JSON stitching**: response chunks are buffered and parsed as
//!   they arrive, so documents split across chunks decode exactly once.
//! - **Errors in-band**: a transport failure mid-stream ends the reply with a
//!   final `[Error: ...]` fragment instead of an `Err`.
//! - **Pluggable transport**: everything HTTP goes through [`transport::HttpTransport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use ragchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::new("https://rag.example.com/api/chat", "sk-...");
//!     let client = RelayClient::new(config)?;
//!
//!     if client.check_health().await {
//!         let mut stream = client
//!             .stream_chat(&[ChatMessage::user("Hello!")], DEFAULT_SYSTEM_PROMPT)
//!             .await;
//!         while let Some(fragment) = stream.next().await {
//!             print!("{fragment}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod liveness;
pub mod revival;
pub mod session;
pub mod streaming;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use client::RelayClient;
pub use config::{Credentials, RelayConfig};
pub use error::{RelayError, Result};
pub use liveness::LivenessProber;
pub use streaming::FragmentStream;

/// Commonly used types
pub mod prelude {
    pub use crate::client::RelayClient;
    pub use crate::config::{
        Credentials, EnvSecrets, LayeredSecrets, MapSecrets, RelayConfig, SecretsProvider,
        TomlSecrets,
    };
    pub use crate::conversation::{ChatDisplay, Conversation};
    pub use crate::error::{RelayError, Result};
    pub use crate::liveness::LivenessProber;
    pub use crate::revival::{RevivalObserver, RevivalPolicy, SilentObserver, revive_server};
    pub use crate::session::{DEFAULT_SYSTEM_PROMPT, MEDICAL_DISCLAIMER, SessionContext};
    pub use crate::streaming::{FragmentStream, StreamState};
    pub use crate::types::{ChatMessage, ChatRole, ChatTranscript};
}
