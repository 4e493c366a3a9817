//! TextGenerator — the external text-generation collaborator.
//!
//! Concrete backends are chosen once at startup (see [`crate::providers::select_generator`]);
//! nothing downstream knows which one answered.

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::Turn;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("generation response could not be read: {0}")]
    Decode(String),
    #[error("generation response carried no content")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short name for logs ("groq", "mock", ...).
    fn name(&self) -> &str;

    /// One chat turn. `history` is already sanitized and never ends on a user turn.
    async fn generate_reply(
        &self,
        system_prompt: Option<&str>,
        history: &[Turn],
        live_message: &str,
    ) -> Result<String, GenerateError>;

    /// Free-form instruction whose answer is expected to contain one JSON object.
    async fn generate_structured(&self, prompt: &str) -> Result<String, GenerateError>;
}

const MOCK_REPLY: &str = "I hear you. What feeling sits at the root of that tonight?";

const MOCK_STRUCTURED: &str = r#"{
  "title": "Hard-Boiled Wonderland and the End of the World",
  "author": "Haruki Murakami",
  "line": "For a night when you want to cool your head between the real and the unreal.",
  "reason": "Your words suggest a need to sort your thoughts quietly. This story offers a calm landing place between logic and feeling.",
  "options": ["Tell me more", "I'm not sure", "That's exactly it", "Can I have a book now?"]
}"#;

/// Offline generator with canned answers. Used when no provider key is configured.
#[derive(Debug, Default, Clone)]
pub struct MockGenerator;

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_reply(
        &self,
        _system_prompt: Option<&str>,
        history: &[Turn],
        _live_message: &str,
    ) -> Result<String, GenerateError> {
        tracing::debug!(history = history.len(), "mock reply");
        Ok(MOCK_REPLY.to_string())
    }

    async fn generate_structured(&self, _prompt: &str) -> Result<String, GenerateError> {
        Ok(MOCK_STRUCTURED.to_string())
    }
}
