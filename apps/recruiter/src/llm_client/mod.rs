/// LLM Client — the single point of entry for all Claude API calls in the recruiter.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Resume parsing, profile generation and candidate scoring all go through here.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
/// Low but non-zero: extraction and scoring want stable output.
const TEMPERATURE: f32 = 0.2;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl MessagesResponse {
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Outcome of a single request that did not produce a response.
enum Failure {
    Retryable(LlmError),
    Fatal(LlmError),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Prefers the API's own error message over the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Wraps the Anthropic Messages API with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: String, model: String) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        let base_url = base_url.into();
        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, Failure> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| Failure::Retryable(LlmError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            let error = LlmError::Api {
                status: status.as_u16(),
                message: error_message(response.text().await.unwrap_or_default()),
            };
            return Err(if is_retryable(status) {
                Failure::Retryable(error)
            } else {
                Failure::Fatal(error)
            });
        }

        response
            .json()
            .await
            .map_err(|e| Failure::Fatal(LlmError::Http(e)))
    }

    /// Sends one user turn and returns the first text block.
    /// 429 and 5xx responses are retried with exponential backoff (1s, 2s).
    pub async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 << (attempt - 1));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying LLM call");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&request).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            model = %self.model,
                            input_tokens = usage.input_tokens,
                            output_tokens = usage.output_tokens,
                            "LLM call succeeded"
                        );
                    }
                    return response.into_text().ok_or(LlmError::EmptyContent);
                }
                Err(Failure::Fatal(e)) => return Err(e),
                Err(Failure::Retryable(e)) => {
                    warn!("LLM call failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    /// Calls the LLM and deserializes the reply as JSON.
    /// The prompt must instruct the model to return a JSON object.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.complete(prompt, system).await?;
        Ok(serde_json::from_str(json_payload(&text))?)
    }
}

/// Narrows model output to the JSON it carries: code fences are dropped,
/// then chatty framing around the outermost object.
fn json_payload(text: &str) -> &str {
    let mut body = text.trim();
    for fence in ["```json", "```"] {
        if let Some(rest) = body.strip_prefix(fence) {
            body = rest.trim();
            body = body.strip_suffix("```").unwrap_or(body).trim();
            break;
        }
    }
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => &body[start..=end],
        _ => body,
    }
}
