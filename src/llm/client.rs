//! Chat completion client for the Hugging Face inference router.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Provider;
use crate::error::InferenceError;

use super::prompt::{ChatMessage, ChatRequest};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable to override the request timeout.
const TIMEOUT_ENV_VAR: &str = "GITAI_TIMEOUT";

/// Environment variable to point the client at another OpenAI-compatible endpoint.
const BASE_URL_ENV_VAR: &str = "GITAI_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Maximum number of characters of an error body carried into the error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Get timeout from environment or use default.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

fn get_base_url() -> String {
    match env::var(BASE_URL_ENV_VAR) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

/// Sends one chat completion request and returns the raw text.
///
/// Implementations make exactly one network call per `generate`; retrying is
/// the caller's decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: &ChatRequest) -> Result<String, InferenceError>;
}

/// Client for the OpenAI-compatible chat completion API of the Hugging Face router.
pub struct HfInferenceClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HfInferenceClient {
    /// Build a client against the default (or `GITAI_BASE_URL`) endpoint.
    pub fn new(token: Option<String>) -> Result<Self, InferenceError> {
        Self::with_base_url(token, get_base_url())
    }

    pub fn with_base_url(
        token: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(get_timeout())
            .build()
            .map_err(|e| InferenceError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: String,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Model identifier as the router expects it, with the provider as a suffix.
fn routed_model(model: &str, provider: Provider) -> String {
    match provider {
        Provider::Auto => model.to_string(),
        other => format!("{model}:{other}"),
    }
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((i, _)) => format!("{}...", &body[..i]),
        None => body.to_string(),
    }
}

#[async_trait]
impl InferenceClient for HfInferenceClient {
    async fn generate(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let token = self
            .token
            .as_deref()
            .ok_or(InferenceError::MissingCredential)?;

        let body = CompletionBody {
            model: routed_model(&request.model, request.provider),
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        debug!(model = %body.model, "Sending chat completion request");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|e| {
                debug!("Failed to read error response body: {e}");
                String::new()
            });
            return Err(InferenceError::RequestFailed(format!(
                "HTTP {status}: {}",
                truncate_body(&text)
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::InvalidResponse("no choices returned".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        debug!(response_len = content.len(), "Received chat completion");
        Ok(content)
    }
}
