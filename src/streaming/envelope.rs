//! Stream envelope extraction
//!
//! Each JSON document on the wire looks like
//! `{"model":"...","message":{"role":"assistant","content":"..."},"done":false}`.
//! Only `message.content` and `done` matter here; every other field is ignored
//! and a document with an unexpected shape never fails.

use serde_json::Value;

/// The parts of one streamed document that the decoder acts on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEnvelope {
    /// Non-empty `message.content`, if present
    pub content: Option<String>,
    /// Truthiness of the `done` field
    pub done: bool,
}

impl StreamEnvelope {
    /// Extract the envelope from a decoded document.
    ///
    /// Non-object documents yield an empty envelope (no content, not done).
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let content = object
            .get("message")
            .and_then(Value::as_object)
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .map(str::to_owned);

        let done = object.get("done").is_some_and(is_truthy);

        Self { content, done }
    }

    /// Whether the envelope carries assistant-visible text
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// JSON truthiness: `false`, `null`, `0`, `""`, `[]` and `{}` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_content_and_done() {
        let env = StreamEnvelope::from_value(&json!({
            "model": "lightrag:latest",
            "message": {"role": "assistant", "content": "Hello"},
            "done": false
        }));
        assert_eq!(env.content.as_deref(), Some("Hello"));
        assert!(!env.done);
    }

    #[test]
    fn empty_content_is_not_emitted() {
        let env = StreamEnvelope::from_value(&json!({"message": {"content": ""}, "done": true}));
        assert!(!env.has_content());
        assert!(env.done);
    }

    #[test]
    fn missing_or_odd_message_is_ignored() {
        for doc in [
            json!({"done": false}),
            json!({"message": null}),
            json!({"message": {}}),
            json!({"message": "text"}),
            json!({"message": {"content": 42}}),
        ] {
            assert_eq!(StreamEnvelope::from_value(&doc), StreamEnvelope::default());
        }
    }

    #[test]
    fn non_object_documents_are_ignored() {
        for doc in [json!([1, 2]), json!("done"), json!(7), json!(null)] {
            assert_eq!(StreamEnvelope::from_value(&doc), StreamEnvelope::default());
        }
    }

    #[test]
    fn done_uses_json_truthiness() {
        assert!(StreamEnvelope::from_value(&json!({"done": 1})).done);
        assert!(StreamEnvelope::from_value(&json!({"done": "yes"})).done);
        assert!(!StreamEnvelope::from_value(&json!({"done": 0})).done);
        assert!(!StreamEnvelope::from_value(&json!({"done": null})).done);
        assert!(!StreamEnvelope::from_value(&json!({"done": ""})).done);
    }
}
