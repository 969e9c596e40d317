//! Chat-completions client: the only module that talks to the network.
//!
//! The wire format is the OpenAI-compatible `POST /chat/completions` shape
//! that OpenRouter and most gateways accept. A message's `content` is either a
//! plain string or a list of typed parts, which is how a page image travels
//! alongside the prompt:
//!
//! ```json
//! {"role": "user", "content": [
//!   {"type": "text", "text": "..."},
//!   {"type": "image_url", "image_url": {"url": "data:image/png;base64,..."}}
//! ]}
//! ```
//!
//! The pipeline never sees `reqwest` directly. It calls [`ChatBackend`], so
//! tests can swap in a scripted backend and exercise fallback without a
//! network.

use crate::config::AnalysisConfig;
use crate::error::ChatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    /// A text-only user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message carrying the prompt and one image `data:` URL.
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }

    /// `true` when the message carries at least one image part.
    pub fn has_image(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
        }
    }
}

/// Plain string or list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Sampling options shared by every call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl CompletionOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a response body.
pub fn extract_content(body: &str) -> Result<String, ChatError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::MalformedResponse("no choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ChatError::EmptyContent);
    }
    Ok(content)
}

// ── Backend seam ─────────────────────────────────────────────────────────

/// Anything that can answer a chat completion for a given model id.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `messages` to `model` and return the assistant text.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ChatError>;
}

/// [`ChatBackend`] over HTTPS with bearer authentication.
#[derive(Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpChatClient {
    /// Build a client from the analysis configuration.
    ///
    /// The key may be empty here; [`crate::Analyzer`] refuses to run without
    /// one before any request is made.
    pub fn new(config: &AnalysisConfig) -> Result<Self, ChatError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(title) = config.app_title.as_deref() {
            if let Ok(v) = reqwest::header::HeaderValue::from_str(title) {
                headers.insert("X-Title", v);
            }
        }
        if let Some(referer) = config.app_referer.as_deref() {
            if let Ok(v) = reqwest::header::HeaderValue::from_str(referer) {
                headers.insert("HTTP-Referer", v);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url),
            api_key: config.api_key.clone().unwrap_or_default(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ChatError> {
        let request = ChatRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let content = extract_content(&body)?;
        debug!(model, chars = content.len(), "Chat completion received");
        Ok(content)
    }
}

impl HttpChatClient {
    fn classify(&self, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ChatError::Transport(e.to_string())
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}\u{2026}")
    }
}
