//! The generative backend as an opaque capability.
//!
//! The pipeline only ever sees this trait: given a prompt and constraints,
//! return structured text or fail. Any provider can be substituted without
//! touching pipeline logic. Two implementations ship:
//! - `OpenAiCompatBackend` (client.rs): chat-completions over HTTP (production)
//! - `MockBackend`: preconfigured responses (testing)

use async_trait::async_trait;

use super::models::Usage;

/// One completion request. The backend is treated as a pure function of this
/// request; it has no side effects on caller state beyond its return value.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Errors a backend can surface. Transport failures are retryable by the
/// caller; refusals and empty responses are not.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("request refused: {0}")]
    Refused(String),
    #[error("empty response from backend")]
    Empty,
}

impl BackendError {
    /// Whether a retry with backoff is worth attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable(_) | BackendError::Timeout(_) | BackendError::RateLimited(_)
        )
    }
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, BackendError>;
}

/// Mock backend for testing — pops preconfigured outcomes in order, then
/// repeats the last one.
pub struct MockBackend {
    responses: std::sync::Mutex<Vec<Result<String, BackendError>>>,
    pub calls: std::sync::atomic::AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(Vec::new()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses
            .lock()
            .expect("mock responses lock")
            .push(Ok(content.into()));
        self
    }

    pub fn with_failure(self, error: BackendError) -> Self {
        self.responses
            .lock()
            .expect("mock responses lock")
            .push(Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, BackendError> {
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let responses = self.responses.lock().expect("mock responses lock");
        let outcome = responses
            .get(call)
            .or_else(|| responses.last())
            .ok_or(BackendError::Empty)?;
        match outcome {
            Ok(content) => Ok(CompletionResponse {
                content: content.clone(),
                usage: None,
            }),
            Err(BackendError::Unavailable(msg)) => Err(BackendError::Unavailable(msg.clone())),
            Err(BackendError::Timeout(ms)) => Err(BackendError::Timeout(*ms)),
            Err(BackendError::RateLimited(msg)) => Err(BackendError::RateLimited(msg.clone())),
            Err(BackendError::Refused(msg)) => Err(BackendError::Refused(msg.clone())),
            Err(BackendError::Empty) => Err(BackendError::Empty),
        }
    }
}
