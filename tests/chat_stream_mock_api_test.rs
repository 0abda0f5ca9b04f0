//! Chat streaming against a mock LightRAG endpoint
//!
//! The mock returns Ollama-style newline-free concatenated JSON documents,
//! which is what the backend actually sends.

use std::time::Duration;

use futures_util::StreamExt;
use ragchat::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RelayClient {
    let config = RelayConfig::new(format!("{}/api/chat", server.uri()), "sk-test")
        .with_health_url(format!("{}/health", server.uri()))
        .with_stream_timeout(Duration::from_secs(5));
    RelayClient::new(config).unwrap()
}

#[tokio::test]
async fn test_stream_chat_sends_payload_and_relays_fragments() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"model":"lightrag:latest","message":{"role":"assistant","content":"Hi"},"done":false}"#,
        r#"{"model":"lightrag:latest","message":{"role":"assistant","content":" there"},"done":false}"#,
        "\n",
        r#"{"model":"lightrag:latest","message":{"role":"assistant","content":"!"},"done":true}"#,
        r#"{"message":{"content":"ignored"}}"#,
    );

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(json!({
            "model": "lightrag:latest",
            "stream": true,
            "system": "be kind",
            "messages": [{"role": "user", "content": "hello"}],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = client_for(&server)
        .stream_chat(&[ChatMessage::user("hello")], "be kind")
        .await;

    let mut fragments = Vec::new();
    while let Some(fragment) = stream.next().await {
        fragments.push(fragment);
    }
    assert_eq!(fragments, ["Hi", " there", "!"]);
    assert_eq!(stream.state(), StreamState::Done);
    assert_eq!(stream.accumulated(), "Hi there!");
}

#[tokio::test]
async fn test_stream_chat_error_status_yields_error_fragment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .stream_chat(&[ChatMessage::user("hello")], "")
        .await
        .collect_response()
        .await;
    assert_eq!(response, "[Error: API error 500: Internal Server Error]");
}

#[tokio::test]
async fn test_stream_chat_timeout_yields_error_fragment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"message":{"content":"late"},"done":true}"#)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = RelayConfig::new(format!("{}/api/chat", server.uri()), "sk-test")
        .with_stream_timeout(Duration::from_millis(200));
    let mut stream = RelayClient::new(config)
        .unwrap()
        .stream_chat(&[ChatMessage::user("hello")], "")
        .await;

    let fragment = stream.next().await.unwrap();
    assert!(fragment.starts_with("[Error: "), "got {fragment}");
    assert!(fragment.ends_with(']'));
    assert_eq!(stream.next().await, None);
    assert_eq!(stream.state(), StreamState::Errored);
}

#[tokio::test]
async fn test_conversation_turn_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            r#"{"message":{"content":"Hello, "}}"#,
            r#"{"message":{"content":"superstar"},"done":true}"#,
        )))
        .mount(&server)
        .await;

    struct Collect(Vec<String>);
    impl ChatDisplay for Collect {
        fn render_user(&mut self, _content: &str) {}
        fn render_assistant_partial(&mut self, markdown: &str) {
            self.0.push(markdown.to_string());
        }
    }

    let conversation = Conversation::new(client_for(&server));
    let mut session = SessionContext::new();
    session
        .login("betsy", "beaver", Some(&Credentials::new("betsy", "beaver")))
        .unwrap();
    let mut display = Collect(Vec::new());

    let reply = conversation
        .submit_prompt(&mut session, "hi", &mut display, &mut SilentObserver)
        .await
        .unwrap();

    assert_eq!(reply.content, "Hello, superstar");
    assert_eq!(display.0, ["Hello, ", "Hello, superstar"]);
    assert_eq!(session.transcript().len(), 2);
}
