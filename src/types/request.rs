//! Chat completion request payload

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Body of the chat completion POST
///
/// Built fresh for every call from a snapshot of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system: String,
    pub stream: bool,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl ChatCompletionRequest {
    /// Default model id of the LightRAG Ollama-compatible endpoint
    pub const DEFAULT_MODEL: &'static str = "lightrag:latest";

    /// Create a streaming request
    pub fn streaming(
        model: impl Into<String>,
        messages: &[ChatMessage],
        system: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: messages.to_vec(),
            system: system.into(),
            stream: true,
            options: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn streaming_payload_shape() {
        let request = ChatCompletionRequest::streaming(
            ChatCompletionRequest::DEFAULT_MODEL,
            &[ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            "be nice",
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "lightrag:latest",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ],
                "system": "be nice",
                "stream": true,
                "options": {}
            })
        );
    }
}
