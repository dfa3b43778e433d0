use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::traits::{ConversationTurn, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.role {
            Role::User => Self::user(turn.content.clone()),
            Role::Assistant => Self::assistant(turn.content.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub model: &'a str,
}

pub type ChunkStream = BoxStream<'static, anyhow::Result<String>>;

/// A language-model backend. Adapters own transport and vendor encoding;
/// the orchestrator only ever sees this contract.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Vendor identifier, folded into cache fingerprints.
    fn vendor(&self) -> &str;

    /// Model used when a call does not override it.
    fn model(&self) -> &str;

    async fn complete(&self, request: ChatRequest<'_>) -> anyhow::Result<String>;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Finite, non-restartable sequence of text chunks.
    async fn complete_stream(&self, request: ChatRequest<'_>) -> anyhow::Result<ChunkStream>;
}
