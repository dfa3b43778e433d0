use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered conversation history. Turns only ever enter as a
/// (user, assistant) pair.
#[async_trait]
pub trait Memory: Send + Sync {
    fn name(&self) -> &str;

    /// Oldest to newest.
    async fn history(&self) -> anyhow::Result<Vec<ConversationTurn>>;

    async fn append(
        &self,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> anyhow::Result<()>;

    async fn clear(&self) -> anyhow::Result<()>;

    async fn len(&self) -> anyhow::Result<usize> {
        Ok(self.history().await?.len())
    }
}
