pub mod backend;
pub mod client;
pub mod models;
pub mod parse;
pub mod prompts;

pub use backend::{CompletionRequest, CompletionResponse, GenerativeBackend, MockBackend};
pub use client::OpenAiCompatBackend;
pub use models::Usage;
