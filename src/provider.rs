//! Completion provider boundary.
//!
//! The pipeline treats the remote model as an opaque callable that maps a
//! prompt string to a response value. Providers are not trusted to return a
//! plain string: some return a list of candidate completions, some return
//! structured JSON. `script::normalize` reduces every shape to one string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::API_KEY_ENV_VAR;
use crate::error::{Error, Result};

/// OpenRouter chat completions endpoint.
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";

const MAX_COMPLETION_TOKENS: u32 = 4096;

/// Raw response value from a completion provider.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// A single completion string.
    Text(String),
    /// Multiple candidate completions; only the first is used.
    Candidates(Vec<String>),
    /// An implementation-defined JSON value.
    Value(serde_json::Value),
}

/// Opaque completion service.
///
/// One call per pipeline invocation, no retry and no timeout beyond what
/// the transport applies; a hung provider blocks the whole pipeline.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<ProviderResponse>;

    /// List the model identifiers this provider can serve.
    async fn list_models(&self) -> Result<Vec<String>>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Provider backed by the OpenRouter chat completions API.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenRouterProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration(format!(
                "no OpenRouter API key configured; set {}",
                API_KEY_ENV_VAR
            ))
        })
    }
}

/// Model identifiers keep the `openrouter/` routing prefix callers know
/// from the default config; the wire API wants the bare id.
fn wire_model(model: &str) -> &str {
    model.strip_prefix("openrouter/").unwrap_or(model)
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    async fn complete(&self, model: &str, prompt: &str) -> Result<ProviderResponse> {
        let api_key = self.key()?;

        let request = ChatRequest {
            model: wire_model(model).to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
            stream: false,
        };

        debug!(model, prompt_len = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(OPENROUTER_URL)
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/cameronspears/ropesmith")
            .header("X-Title", "ropesmith")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Provider(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = match status.as_u16() {
                401 | 403 => format!("API key rejected ({}); check {}", status, API_KEY_ENV_VAR),
                429 => "rate limited by OpenRouter; try again shortly".to_string(),
                500..=599 => format!("OpenRouter server error ({})", status),
                _ => format!("API error {}: {}", status, truncate_str(&text, 200)),
            };
            return Err(Error::Provider(message));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            Error::Provider(format!(
                "failed to parse OpenRouter response: {}: {}",
                e,
                truncate_str(&text, 200)
            ))
        })?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(ProviderResponse::Text(content))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let api_key = self.key()?;

        let response = self
            .client
            .get(OPENROUTER_MODELS_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Provider(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Provider(format!(
                "API error {}: {}",
                status,
                truncate_str(&text, 200)
            )));
        }

        let parsed: ModelsResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Provider(format!("failed to parse models response: {}", e)))?;

        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }
}

/// Truncate a string for display (Unicode-safe)
fn truncate_str(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}
