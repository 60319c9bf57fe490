pub mod prompt;
pub mod gemini;
pub mod conversation;

pub use prompt::*;
pub use gemini::*;
pub use conversation::*;

use thiserror::Error;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Assistant is not configured: no API key")]
    NotConfigured,

    #[error("API key rejected by the language model service")]
    InvalidApiKey,

    #[error("Language model quota exhausted")]
    QuotaExceeded,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Language model not available")]
    ModelUnavailable,

    #[error("Language model service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Language model returned an empty reply")]
    EmptyReply,

    #[error("Message is empty")]
    EmptyPrompt,
}

impl AssistantError {
    /// Text safe to show in the chat window.
    pub fn user_message(&self) -> &'static str {
        match self {
            AssistantError::NotConfigured => {
                "The assistant is not set up yet. Make sure the Gemini API key is configured."
            }
            AssistantError::InvalidApiKey => {
                "The API key is not valid. Please check the Gemini API key configuration."
            }
            AssistantError::QuotaExceeded => "The API quota is used up. Please try again later.",
            AssistantError::Network(_) => {
                "Cannot reach the server. Please check your internet connection."
            }
            AssistantError::ModelUnavailable => {
                "The AI model is not available. Please try again later."
            }
            AssistantError::EmptyPrompt => "Please type a message first.",
            AssistantError::Api { .. }
            | AssistantError::ResponseParsing(_)
            | AssistantError::EmptyReply => "Failed to send the message. Please try again.",
        }
    }
}

/// Knobs for the conversational assistant.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            max_output_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_key() {
        let config = AssistantConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.max_output_tokens, 1000);
    }

    #[test]
    fn network_error_hides_detail() {
        let err = AssistantError::Network("dns error: no such host".into());
        assert!(!err.user_message().contains("dns"));
    }

    #[test]
    fn api_error_gets_generic_message() {
        let err = AssistantError::Api {
            status: 500,
            body: "internal".into(),
        };
        assert_eq!(err.user_message(), "Failed to send the message. Please try again.");
    }
}
