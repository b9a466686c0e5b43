//! Chat-generation provider surface for Kiln.
//!
//! Defines the transport-agnostic message types and the `LlmClient` trait the
//! session runtime generates replies through, plus the Gemini-backed
//! `GoogleClient`. The client makes exactly one HTTP attempt per call;
//! recovery is the session runtime's single fallback-model attempt.

mod google;
mod types;

pub use google::{GoogleClient, GoogleConfig};
pub use types::{
    ChatRequest, ChatResponse, ChatUsage, KilnAiError, LlmClient, Message, MessageRole,
};
