//! OpenAI-compatible chat-completions backend.
//!
//! Handles transient transport failures, rate limits and server errors with
//! bounded exponential backoff, enforces a hard request timeout, and never
//! echoes potentially sensitive response bodies into error messages.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use super::backend::{BackendError, CompletionRequest, CompletionResponse, GenerativeBackend};
use super::models::{Usage, DEFAULT_MODEL, FALLBACK_MODELS};

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Environment variables checked, in order, for the API key.
const API_KEY_ENV_VARS: [&str; 2] = ["LODESTAR_API_KEY", "OPENAI_API_KEY"];

const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF_MS: u64 = 1_000;
const BACKOFF_MULTIPLIER: u64 = 2;

/// Maximum length for error content in error messages.
const MAX_ERROR_CONTENT_LEN: usize = 200;

fn truncate_str(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        content.chars().take(max_chars).collect()
    }
}

/// Sanitize API response content for error messages: redact common secret
/// shapes, then truncate.
fn sanitize_api_response(content: &str) -> String {
    let patterns = [
        // Quoted key/value assignments.
        r#"(?i)\b(api[_-]?key|token|secret|password|credential)\b\s*[:=]\s*["']?[^"'\s]{8,}["']?"#,
        // Bearer tokens.
        r#"(?i)\b(bearer)\s+[A-Za-z0-9._-]{16,}"#,
        // Provider-style keys.
        r#"\b(sk-[A-Za-z0-9_-]{16,})\b"#,
    ];

    let mut out = content.to_string();
    for pattern in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            out = re.replace_all(&out, "<redacted-secret>").to_string();
        }
    }
    truncate_str(&out, MAX_ERROR_CONTENT_LEN)
}

pub(crate) fn backoff_secs(retry_count: u32) -> u64 {
    let factor = BACKOFF_MULTIPLIER.pow(retry_count.saturating_sub(1));
    let ms = INITIAL_BACKOFF_MS.saturating_mul(factor);
    (ms / 1000).max(1)
}

fn is_retryable_network_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Read the API key from the environment.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null when a refusal or provider error occurs.
    #[serde(default)]
    content: Option<String>,
    /// Set when content is blocked by moderation.
    #[serde(default)]
    refusal: Option<String>,
}

/// Production backend: one configured model plus a fixed fallback chain,
/// JSON response mode, retry with backoff, hard per-request timeout.
pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    request_timeout: Duration,
}

impl OpenAiCompatBackend {
    /// Build from the environment. Fails when no API key is configured.
    pub fn from_env(
        model: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let api_key = api_key_from_env().ok_or_else(|| {
            BackendError::Unavailable(
                "no API key configured; set LODESTAR_API_KEY or OPENAI_API_KEY".to_string(),
            )
        })?;
        Self::new(DEFAULT_API_URL.to_string(), api_key, model, request_timeout)
    }

    pub fn new(
        api_url: String,
        api_key: String,
        model: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout,
        })
    }

    /// Models to try in order: configured model first, then the fallbacks.
    fn model_chain(&self) -> Vec<String> {
        let mut chain = vec![self.model.clone()];
        for fallback in FALLBACK_MODELS {
            if fallback != self.model {
                chain.push(fallback.to_string());
            }
        }
        chain
    }

    /// Send a request with automatic retry on transient failures: network
    /// errors, 429s, and 5xx responses.
    async fn send_with_retry(&self, request_body: &ChatRequest) -> Result<String, BackendError> {
        let mut last_error = String::new();
        let mut retry_count = 0;

        while retry_count <= MAX_RETRIES {
            let response = match self
                .client
                .post(&self.api_url)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(request_body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    last_error = err.to_string();
                    if is_retryable_network_error(&err) && retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                        continue;
                    }
                    return Err(BackendError::Unavailable(truncate_str(&last_error, 200)));
                }
            };

            let status = response.status();
            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    last_error = err.to_string();
                    if is_retryable_network_error(&err) && retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                        continue;
                    }
                    return Err(BackendError::Unavailable(truncate_str(&last_error, 200)));
                }
            };

            if status.is_success() {
                return Ok(text);
            }

            last_error = text;

            if status.as_u16() == 429 && retry_count < MAX_RETRIES {
                retry_count += 1;
                tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                continue;
            }
            if status.is_server_error() && retry_count < MAX_RETRIES {
                retry_count += 1;
                tokio::time::sleep(Duration::from_secs(backoff_secs(retry_count))).await;
                continue;
            }

            return Err(match status.as_u16() {
                401 => BackendError::Unavailable("invalid API key".to_string()),
                429 => BackendError::RateLimited(format!(
                    "rate limited after {retry_count} retries"
                )),
                500..=599 => BackendError::Unavailable(format!("server error ({status})")),
                _ => BackendError::Unavailable(format!(
                    "API error {}: {}",
                    status,
                    sanitize_api_response(&last_error)
                )),
            });
        }

        Err(BackendError::Unavailable(truncate_str(&last_error, 200)))
    }

    async fn complete_with_model(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, BackendError> {
        let body = ChatRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        // The per-attempt timeout lives on the reqwest client; the outer
        // deadline covers the whole retry schedule so retries are not
        // starved by a single slow attempt.
        let total_backoff: u64 = (1..=MAX_RETRIES).map(backoff_secs).sum();
        let deadline =
            self.request_timeout * (MAX_RETRIES + 1) + Duration::from_secs(total_backoff);
        let text = timeout(deadline, self.send_with_retry(&body))
            .await
            .map_err(|_| BackendError::Timeout(deadline.as_millis() as u64))??;

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            BackendError::Unavailable(format!(
                "failed to parse provider response: {e}\n{}",
                sanitize_api_response(&text)
            ))
        })?;

        let choice = parsed.choices.first();
        if let Some(c) = choice {
            if let Some(refusal) = &c.message.refusal {
                return Err(BackendError::Refused(truncate_str(refusal, 200)));
            }
        }

        let content = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(BackendError::Empty);
        }

        Ok(CompletionResponse {
            content,
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl GenerativeBackend for OpenAiCompatBackend {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, BackendError> {
        let mut last_err: Option<BackendError> = None;
        for model in self.model_chain() {
            match self.complete_with_model(&model, &request).await {
                Ok(response) => return Ok(response),
                Err(err @ BackendError::Refused(_)) => return Err(err),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or(BackendError::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(backoff_secs(1), 1);
        assert_eq!(backoff_secs(2), 2);
        assert_eq!(backoff_secs(3), 4);
    }

    #[test]
    fn sanitize_redacts_secret_bearing_content() {
        let redacted =
            sanitize_api_response("error: Bearer abcdefghijklmnop1234 and sk-abcdefghijklmnop1234");
        assert!(!redacted.contains("abcdefghijklmnop1234"));
        assert!(redacted.contains("<redacted-secret>"));
    }

    #[test]
    fn sanitize_passes_benign_content_truncated() {
        let long = "x".repeat(500);
        let out = sanitize_api_response(&long);
        assert_eq!(out.chars().count(), MAX_ERROR_CONTENT_LEN);
    }

    #[test]
    fn model_chain_starts_with_configured_model_without_duplicates() {
        let backend = OpenAiCompatBackend::new(
            DEFAULT_API_URL.to_string(),
            "sk-test".to_string(),
            Some("gpt-4o".to_string()),
            Duration::from_secs(30),
        )
        .unwrap();
        let chain = backend.model_chain();
        assert_eq!(chain[0], "gpt-4o");
        assert_eq!(chain.iter().filter(|m| m.as_str() == "gpt-4o").count(), 1);
    }

    #[test]
    fn chat_request_serializes_json_response_format() {
        let body = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![],
            temperature: 0.2,
            max_tokens: 100,
            stream: false,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""response_format":{"type":"json_object"}"#));
    }
}
