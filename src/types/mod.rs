//! Chat-related types and request payloads

mod message;
mod request;
mod transcript;

pub use message::{ChatMessage, ChatRole};
pub use request::ChatCompletionRequest;
pub use transcript::ChatTranscript;
