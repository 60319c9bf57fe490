use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::gemini::{ChatBackend, GeminiClient};
use super::prompt::{build_prompt, diagnosis_context};
use super::{AssistantConfig, AssistantError};
use crate::detection::DiagnosisView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Greeting shown before the first exchange. Not part of the model history.
pub const GREETING: &str = "Hello! I'm the Potato Guardian assistant. Ask me anything about potato leaf diseases, how to prevent them, or your detection results.";

/// Conversation with the domain assistant.
///
/// A turn is recorded only once the backend answers, so a failed send
/// leaves the history unchanged and can be retried.
pub struct ChatAssistant<B: ChatBackend> {
    backend: B,
    history: Vec<ChatMessage>,
    diagnosis: Option<String>,
}

impl ChatAssistant<GeminiClient> {
    /// Assistant backed by Gemini. Fails with `NotConfigured` without an API key.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        Ok(Self::new(GeminiClient::from_config(config)?))
    }
}

impl<B: ChatBackend> ChatAssistant<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            history: Vec::new(),
            diagnosis: None,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Let later answers refer to this diagnosis.
    pub fn with_diagnosis(&mut self, view: &DiagnosisView) {
        self.diagnosis = Some(diagnosis_context(view));
    }

    pub fn clear_diagnosis(&mut self) {
        self.diagnosis = None;
    }

    /// Send a user message and return the assistant's reply.
    pub async fn send(&mut self, text: &str) -> Result<ChatMessage, AssistantError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyPrompt);
        }

        let prompt = build_prompt(text, self.diagnosis.as_deref());
        let reply = match self.backend.generate(&self.history, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Assistant reply failed");
                return Err(e);
            }
        };

        let answer = ChatMessage::new(ChatRole::Assistant, reply.trim());
        self.history.push(ChatMessage::new(ChatRole::User, text));
        self.history.push(answer.clone());
        tracing::debug!(turns = self.history.len(), "Assistant replied");
        Ok(answer)
    }

    /// Start a fresh conversation. The attached diagnosis is kept.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::MockChatBackend;
    use crate::detection::{interpret, PredictionResponse};

    #[tokio::test]
    async fn successful_send_records_both_turns() {
        let mut assistant = ChatAssistant::new(MockChatBackend::new("  Remove infected leaves.  "));

        let reply = assistant.send("How do I treat early blight?").await.unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "Remove infected leaves.");

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "How do I treat early blight?");
        assert_eq!(history[1].id, reply.id);
    }

    #[tokio::test]
    async fn failed_send_leaves_history_unchanged() {
        let mut assistant = ChatAssistant::new(MockChatBackend::failing(AssistantError::QuotaExceeded));

        let err = assistant.send("hello").await.unwrap_err();
        assert_eq!(err.user_message(), "The API quota is used up. Please try again later.");
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_calling_backend() {
        let mut assistant = ChatAssistant::new(MockChatBackend::new("unused"));
        assert!(matches!(
            assistant.send("   ").await,
            Err(AssistantError::EmptyPrompt)
        ));
        assert!(assistant.backend().prompts().is_empty());
    }

    #[tokio::test]
    async fn history_grows_with_each_turn() {
        let mut assistant = ChatAssistant::new(MockChatBackend::new("first").then("second"));
        assistant.send("one").await.unwrap();
        assistant.send("two").await.unwrap();

        let prompts = assistant.backend().prompts();
        assert_eq!(prompts[0].0, 0);
        assert_eq!(prompts[1].0, 2);
        assert!(prompts[1].1.ends_with("User question: two"));
    }

    #[tokio::test]
    async fn diagnosis_context_reaches_prompt() {
        let mut assistant = ChatAssistant::new(MockChatBackend::new("ok"));
        let view = interpret(&PredictionResponse::new("Early_Blight", 0.72));
        assistant.with_diagnosis(&view);
        assistant.send("Is it serious?").await.unwrap();

        let prompts = assistant.backend().prompts();
        assert!(prompts[0].1.contains("Early Blight (72% probability, severity medium)"));
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let mut assistant = ChatAssistant::new(MockChatBackend::new("ok"));
        assistant.send("hello").await.unwrap();
        assistant.reset();
        assert!(assistant.history().is_empty());
    }

    #[test]
    fn from_config_requires_key() {
        assert!(matches!(
            ChatAssistant::from_config(&AssistantConfig::default()),
            Err(AssistantError::NotConfigured)
        ));
    }
}
