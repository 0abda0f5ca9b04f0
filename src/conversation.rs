//! One chat turn
//!
//! Wake the backend, record the user's message, stream the reply into the
//! display as it grows, then record the reply. This is the caller side of
//! the relay; the display surface is abstracted behind [`ChatDisplay`].

use futures_util::StreamExt;

use crate::client::RelayClient;
use crate::error::{RelayError, Result};
use crate::revival::{RevivalObserver, RevivalPolicy};
use crate::session::SessionContext;
use crate::types::ChatMessage;

/// Surface that shows the conversation
pub trait ChatDisplay: Send {
    /// The user's message was accepted
    fn render_user(&mut self, content: &str);

    /// The assistant reply so far, as markdown; called after every fragment
    fn render_assistant_partial(&mut self, markdown: &str);

    /// The reply is complete
    fn render_assistant_final(&mut self, _markdown: &str) {}
}

/// Runs chat turns against one client
#[derive(Debug, Clone)]
pub struct Conversation {
    client: RelayClient,
    revival: RevivalPolicy,
}

impl Conversation {
    pub fn new(client: RelayClient) -> Self {
        Self {
            client,
            revival: RevivalPolicy::default(),
        }
    }

    pub fn with_revival_policy(mut self, policy: RevivalPolicy) -> Self {
        self.revival = policy;
        self
    }

    pub fn client(&self) -> &RelayClient {
        &self.client
    }

    /// Submit `prompt` and return the recorded assistant message.
    ///
    /// Fails only when the session is logged out or the backend cannot be
    /// woken; in both cases the transcript is left untouched. Streaming
    /// failures end up inside the reply text as an `[Error: ...]` fragment.
    pub async fn submit_prompt(
        &self,
        session: &mut SessionContext,
        prompt: &str,
        display: &mut dyn ChatDisplay,
        observer: &mut dyn RevivalObserver,
    ) -> Result<ChatMessage> {
        if !session.is_logged_in() {
            return Err(RelayError::AuthenticationError(
                "Login required before chatting".to_string(),
            ));
        }

        match self.client.revive(&self.revival, observer).await {
            Ok(_) => session.mark_server_awake(true),
            Err(e) => {
                session.mark_server_awake(false);
                return Err(e);
            }
        }

        session.push_message(ChatMessage::user(prompt));
        display.render_user(prompt);

        let mut stream = self
            .client
            .stream_chat(session.transcript().as_slice(), session.system_prompt())
            .await;

        let mut response = String::new();
        while let Some(fragment) = stream.next().await {
            response.push_str(&fragment);
            display.render_assistant_partial(&response);
        }
        display.render_assistant_final(&response);

        tracing::info!(
            session = %session.id(),
            fragments = stream.fragments_emitted(),
            "Assistant reply complete after {:.2}s",
            stream.elapsed().as_secs_f64()
        );

        let reply = ChatMessage::assistant(response);
        session.push_message(reply.clone());
        Ok(reply)
    }
}
