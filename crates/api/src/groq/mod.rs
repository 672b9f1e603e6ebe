//! Groq chat-completions client for the sales assistant.
//!
//! Groq serves an OpenAI-compatible API; only the non-streaming
//! `/chat/completions` call is used.

mod client;
mod error;
pub mod types;

pub use client::GroqClient;
pub use error::GroqError;
pub use types::{ChatMessage, Role};
