//! Append-only conversation history

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Ordered, append-only history of a session's messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message; existing entries are never modified
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a ChatTranscript {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Vec<ChatMessage>> for ChatTranscript {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_append_order() {
        let mut transcript = ChatTranscript::new();
        transcript.push(ChatMessage::user("one"));
        transcript.push(ChatMessage::assistant("two"));
        let contents: Vec<_> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two"]);
        assert_eq!(transcript.last().map(|m| m.content.as_str()), Some("two"));
    }

    #[test]
    fn serializes_as_plain_array() {
        let transcript = ChatTranscript::from(vec![ChatMessage::user("hi")]);
        let value = serde_json::to_value(&transcript).unwrap();
        assert!(value.is_array());
    }
}
