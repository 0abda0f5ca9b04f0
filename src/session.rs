//! Session context
//!
//! Everything a chat session owns: transcript, active system prompt, the
//! login flag and whether the backend has been woken. The context is passed
//! explicitly to every handler; there is no global session state.

use uuid::Uuid;

use crate::config::Credentials;
use crate::error::{RelayError, Result};
use crate::types::{ChatMessage, ChatTranscript};

/// System prompt used until the operator sets another one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Betsy the Beaver, a compassionate assistant in a PCOS community app developed by Neuraura, \
supporting users by bridging clinical terms and everyday language with evidence-based insights \
from Neuraura's curated articles (latest PCOS research up to May 2025) on symptoms, treatments, lifestyle, \
and emotional well-being. Use a warm, cheeky, empathetic tone like a concerned aunt, \
with varied endearments like \"love,\" \"sweetie,\" or \"superstar,\" simple language, and a touch of humor. \
Translate complex terms (e.g., \"insulin resistance\" to \"struggling with sugar energy\"). \
Keep responses short (1-2 sentences advice, 1-2 sentences explanation), validate feelings, \
and ask follow-ups (e.g., \"How's that been feeling?\"). \
Be direct, supportive, fun, and smart, prioritizing emotional support for PCOS's sensitive nature. \
Never diagnose or treat; suggest consulting a healthcare professional if unsure, for urgent cases (e.g., crises), \
or if info's unavailable (e.g., \"I don't have that, sweetie, ask your doctor?\"). \
Personalize with user details (e.g., pets).";

/// Shown next to the chat window
pub const MEDICAL_DISCLAIMER: &str = "The information provided by Ask Betsy! is intended for educational purposes only \
and is not a substitute for professional medical advice, diagnosis, or treatment. Always seek the advice of your \
physician or other qualified health provider with any questions you may have regarding a medical condition. \
Never disregard professional medical advice or delay in seeking it because of something you have read in this \
content. If you are experiencing a medical emergency, call your doctor or emergency services immediately.";

/// State of one chat session
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: Uuid,
    transcript: ChatTranscript,
    system_prompt: String,
    logged_in: bool,
    server_awake: bool,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Empty transcript, default prompt, logged out
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: ChatTranscript::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            logged_in: false,
            server_awake: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
        tracing::info!(session = %self.id, "System prompt updated");
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Check the credentials and flip the login flag.
    ///
    /// Without configured credentials every attempt is rejected.
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        let accepted = credentials.is_some_and(|c| c.matches(username, password));
        self.logged_in = accepted;
        if accepted {
            tracing::info!(session = %self.id, "Login successful");
            Ok(())
        } else {
            tracing::warn!(session = %self.id, "Rejected login for {:?}", username);
            Err(RelayError::AuthenticationError(
                "Incorrect username or password".to_string(),
            ))
        }
    }

    pub fn logout(&mut self) {
        self.logged_in = false;
    }

    pub fn server_awake(&self) -> bool {
        self.server_awake
    }

    pub fn mark_server_awake(&mut self, awake: bool) {
        self.server_awake = awake;
    }

    /// Append a message to the transcript
    pub fn push_message(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    /// Start a fresh session with an empty transcript.
    ///
    /// The login flag and system prompt carry over; the session id changes.
    pub fn restart(&mut self) {
        let previous = self.id;
        self.id = Uuid::new_v4();
        self.transcript = ChatTranscript::new();
        self.server_awake = false;
        tracing::info!(session = %self.id, previous = %previous, "Session restarted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("admin", "s3cret")
    }

    #[test]
    fn defined_initial_state() {
        let session = SessionContext::new();
        assert!(session.transcript().is_empty());
        assert_eq!(session.system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert!(!session.is_logged_in());
        assert!(!session.server_awake());
    }

    #[test]
    fn login_success_and_failure() {
        let mut session = SessionContext::new();
        assert!(session.login("admin", "s3cret", Some(&credentials())).is_ok());
        assert!(session.is_logged_in());

        let err = session.login("admin", "wrongpass", Some(&credentials()));
        assert!(matches!(err, Err(RelayError::AuthenticationError(_))));
        assert!(!session.is_logged_in());

        assert!(session.login("user", "s3cret", Some(&credentials())).is_err());
        assert!(session.login("", "", Some(&credentials())).is_err());
        assert!(session.login("admin", "", Some(&credentials())).is_err());
        assert!(session.login("", "s3cret", Some(&credentials())).is_err());
    }

    #[test]
    fn login_without_credentials_is_rejected() {
        let mut session = SessionContext::new();
        assert!(session.login("admin", "s3cret", None).is_err());
        assert!(!session.is_logged_in());
    }

    #[test]
    fn restart_keeps_login_and_prompt() {
        let mut session = SessionContext::new().with_system_prompt("custom");
        session.login("admin", "s3cret", Some(&credentials())).unwrap();
        session.push_message(ChatMessage::user("hi"));
        session.mark_server_awake(true);
        let old_id = session.id();

        session.restart();
        assert_ne!(session.id(), old_id);
        assert!(session.transcript().is_empty());
        assert!(session.is_logged_in());
        assert_eq!(session.system_prompt(), "custom");
        assert!(!session.server_awake());
    }
}
