//! Assistant chat relayed to a hosted LLM.

pub mod gemini;
pub mod router;

use serde::{Deserialize, Serialize};

pub use gemini::{extract_reply, GeminiRelay, SAFETY_REFUSAL};
pub use router::{chat_router, SharedRelay};

/// Author of a conversation turn, in the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPart {
    pub text: String,
}

/// One prior message replayed to the provider as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub parts: Vec<ChatPart>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            parts: vec![ChatPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("chat assistant is not configured")]
    Unconfigured,
    #[error("chat provider error: {0}")]
    Upstream(String),
}

/// Produces the assistant's next message for a conversation.
#[async_trait::async_trait]
pub trait ChatRelay: Send + Sync {
    async fn reply(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, ChatError>;
}

/// Stand-in used when no provider key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredRelay;

#[async_trait::async_trait]
impl ChatRelay for UnconfiguredRelay {
    async fn reply(&self, _prompt: &str, _history: &[ChatTurn]) -> Result<String, ChatError> {
        Err(ChatError::Unconfigured)
    }
}

/// Rejects blank prompts before anything leaves the process.
pub(crate) fn validate_prompt(prompt: &str) -> Result<&str, ChatError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ChatError::Validation("Prompt is required".to_string()));
    }
    Ok(prompt)
}
