//! Gemini model client used by the STATUR coaching assistant
//!
//! This crate implements:
//! - The `ChatClient` trait the conversation layer talks to
//! - A Gemini implementation with SSE streaming and client-side history
//! - The one-shot logo generation service
//! - Shared error types and retry utilities


mod utils;

pub mod gemini;
pub mod logo;
pub mod types;

pub use gemini::GeminiClient;
pub use logo::LogoService;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Structure to represent different types of streaming content
#[derive(Debug, Clone)]
pub enum StreamingChunk {
    /// Regular text content
    Text(String),
    /// Streaming has finished for this request
    StreamingComplete,
}

pub type StreamingCallback = Box<dyn Fn(&StreamingChunk) -> Result<()> + Send + Sync>;

/// Trait for the chat client the conversation controller owns
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends a message and returns the complete reply text
    async fn send_message(&mut self, text: &str) -> Result<String>;

    /// Sends a message, streaming reply fragments through the callback.
    /// Returns the complete reply text once the stream ends.
    async fn send_message_stream(
        &mut self,
        text: &str,
        callback: &StreamingCallback,
    ) -> Result<String>;
}
