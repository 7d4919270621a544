//! Pipeline engine and LLM orchestration for Lodestar.

pub mod cancel;
pub mod context;
pub mod llm;
pub mod pipeline;
pub mod synthesis;
mod text;
pub mod validate;

pub use cancel::CancellationToken;
pub use context::{ContextBuilder, ContextBuilderConfig};
pub use llm::backend::{CompletionRequest, CompletionResponse, GenerativeBackend, MockBackend};
pub use llm::client::OpenAiCompatBackend;
pub use pipeline::{run_pipeline, PipelineOptions, RunDiagnostics, RunOutcome};
pub use synthesis::{IdeaSynthesizer, RigorMode};
pub use validate::{RefinementValidator, ValidationReport};
