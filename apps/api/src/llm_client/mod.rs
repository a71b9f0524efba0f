//! Messages API client for the optional AI collaborator.
//!
//! Only `analysis` talks to the model, and only through this client. Transient
//! failures (429, 5xx, dropped connections) are retried with exponential
//! backoff; anything else fails on the first attempt.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// Model recorded as the source of AI-produced artifacts.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_OUTPUT_TOKENS: u32 = 4096;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("model reply is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model reply has no text")]
    EmptyReply,
}

impl LlmError {
    /// Whether another attempt could succeed.
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Transport(e) => !e.is_decode(),
            LlmError::Status { status, .. } => is_retryable_status(*status),
            LlmError::Decode(_) | LlmError::EmptyReply => false,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(&status)
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ReplyBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
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

impl MessagesReply {
    /// Concatenated text blocks, in reply order.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// The API's error message when the body is an error envelope, else the body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body)
}

/// Locates the JSON object in a model reply, tolerating code fences and
/// surrounding prose.
fn json_payload(reply: &str) -> &str {
    let trimmed = reply.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    /// `attempt_timeout` bounds each HTTP attempt; see `call_budget` for the
    /// bound on a whole call.
    pub fn new(api_key: String, attempt_timeout: Duration) -> Self {
        let retry = RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BACKOFF_BASE,
            timeout: attempt_timeout,
        };
        let http = Client::builder()
            .timeout(retry.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "HTTP client builder failed, using defaults");
                Client::new()
            });
        Self {
            http,
            api_key,
            retry,
        }
    }

    /// Worst-case duration of `call_text`, all retries and backoff included.
    pub fn call_budget(&self) -> Duration {
        self.retry.budget()
    }

    pub fn model(&self) -> &'static str {
        MODEL
    }

    async fn send_once(&self, request: &MessagesRequest<'_>) -> Result<MessagesReply, LlmError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: error_message(body),
            });
        }
        Ok(response.json().await?)
    }

    /// Sends one user turn and returns the trimmed reply text.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_OUTPUT_TOKENS,
            system,
            messages: [UserTurn {
                role: "user",
                content: prompt,
            }],
        };

        let mut retry = 0;
        loop {
            match self.send_once(&request).await {
                Ok(reply) => {
                    if let Some(usage) = &reply.usage {
                        debug!(
                            model = MODEL,
                            input_tokens = usage.input_tokens,
                            output_tokens = usage.output_tokens,
                            "Model call succeeded"
                        );
                    }
                    let text = reply.text();
                    let text = text.trim();
                    if text.is_empty() {
                        return Err(LlmError::EmptyReply);
                    }
                    return Ok(text.to_string());
                }
                Err(e) if e.is_transient() && retry + 1 < self.retry.attempts() => {
                    retry += 1;
                    let delay = self.retry.delay_before(retry);
                    warn!(
                        error = %e,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like `call_text`, then decodes the JSON object in the reply.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.call_text(prompt, system).await?;
        Ok(serde_json::from_str(json_payload(&text))?)
    }
}
