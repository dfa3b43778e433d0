use async_trait::async_trait;
use std::sync::Mutex;

use crate::memory::lock_poisoned;
use crate::traits::{ConversationTurn, Memory};

/// Keeps every turn for the lifetime of the process.
#[derive(Default)]
pub struct UnboundedMemory {
    turns: Mutex<Vec<ConversationTurn>>,
}

impl UnboundedMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Memory for UnboundedMemory {
    fn name(&self) -> &str {
        "unbounded"
    }

    async fn history(&self) -> anyhow::Result<Vec<ConversationTurn>> {
        Ok(self.turns.lock().map_err(lock_poisoned)?.clone())
    }

    async fn append(
        &self,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> anyhow::Result<()> {
        let mut turns = self.turns.lock().map_err(lock_poisoned)?;
        turns.push(user);
        turns.push(assistant);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.turns.lock().map_err(lock_poisoned)?.clear();
        Ok(())
    }

    async fn len(&self) -> anyhow::Result<usize> {
        Ok(self.turns.lock().map_err(lock_poisoned)?.len())
    }
}
