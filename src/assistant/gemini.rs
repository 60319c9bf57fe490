use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::conversation::{ChatMessage, ChatRole};
use super::{AssistantConfig, AssistantError};

/// Language model behind the assistant.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate a reply to `prompt`, given the earlier turns of the conversation.
    async fn generate(&self, history: &[ChatMessage], prompt: &str)
        -> Result<String, AssistantError>;
}

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    max_output_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Build a client from config. Fails without an API key.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AssistantError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Request body for `generateContent`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Response body from `generateContent`.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

/// Map an error status and body to the failure the user should see.
pub fn classify_api_failure(status: u16, body: &str) -> AssistantError {
    let lowered = body.to_lowercase();
    if lowered.contains("api key") || lowered.contains("api_key") || status == 401 || status == 403 {
        AssistantError::InvalidApiKey
    } else if status == 429 || lowered.contains("quota") || lowered.contains("rate limit") {
        AssistantError::QuotaExceeded
    } else if status == 404 || (lowered.contains("model") && lowered.contains("not found")) {
        AssistantError::ModelUnavailable
    } else {
        AssistantError::Api {
            status,
            body: body.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(
        &self,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, AssistantError> {
        let mut contents: Vec<Content<'_>> = history
            .iter()
            .map(|message| Content {
                role: wire_role(message.role),
                parts: [Part {
                    text: &message.content,
                }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: [Part { text: prompt }],
        });

        let body = GenerateRequest {
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Assistant request failed");
                AssistantError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %self.model, "Assistant service returned error status");
            return Err(classify_api_failure(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ResponseParsing(e.to_string()))?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(AssistantError::EmptyReply);
        }
        Ok(reply)
    }
}

/// Mock backend for testing: replays queued replies and records prompts.
pub struct MockChatBackend {
    replies: Mutex<Vec<Result<String, AssistantError>>>,
    prompts: Mutex<Vec<(usize, String)>>,
}

impl MockChatBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            replies: Mutex::new(vec![Ok(reply.to_string())]),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AssistantError) -> Self {
        Self {
            replies: Mutex::new(vec![Err(error)]),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply after the existing ones.
    pub fn then(self, reply: &str) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push(Ok(reply.to_string()));
        }
        self
    }

    /// Prompts received so far, each with the history length it was sent with.
    pub fn prompts(&self) -> Vec<(usize, String)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn generate(
        &self,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, AssistantError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((history.len(), prompt.to_string()));
        }
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| AssistantError::Network("mock lock poisoned".into()))?;
        if replies.is_empty() {
            return Err(AssistantError::EmptyReply);
        }
        replies.remove(0)
    }
}
