use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::memory::lock_poisoned;
use crate::traits::{ConversationTurn, Memory};

type Pair = (ConversationTurn, ConversationTurn);

/// Keeps the `max_turns` most recent user/assistant pairs, evicting the
/// oldest pair first.
pub struct ShortMemoryBuffer {
    pairs: Mutex<VecDeque<Pair>>,
    max_turns: usize,
}

impl ShortMemoryBuffer {
    pub fn new(max_turns: usize) -> Self {
        Self {
            pairs: Mutex::new(VecDeque::with_capacity(max_turns.min(64))),
            max_turns,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

#[async_trait]
impl Memory for ShortMemoryBuffer {
    fn name(&self) -> &str {
        "short_buffer"
    }

    async fn history(&self) -> anyhow::Result<Vec<ConversationTurn>> {
        let pairs = self.pairs.lock().map_err(lock_poisoned)?;
        Ok(pairs
            .iter()
            .flat_map(|(user, assistant)| [user.clone(), assistant.clone()])
            .collect())
    }

    async fn append(
        &self,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> anyhow::Result<()> {
        let mut pairs = self.pairs.lock().map_err(lock_poisoned)?;
        if self.max_turns == 0 {
            return Ok(());
        }
        while pairs.len() >= self.max_turns {
            pairs.pop_front();
        }
        pairs.push_back((user, assistant));
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.pairs.lock().map_err(lock_poisoned)?.clear();
        Ok(())
    }

    async fn len(&self) -> anyhow::Result<usize> {
        Ok(self.pairs.lock().map_err(lock_poisoned)?.len() * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn push(memory: &ShortMemoryBuffer, message: &str) {
        memory
            .append(
                ConversationTurn::user(message),
                ConversationTurn::assistant(format!("re: {}", message)),
            )
            .await
            .unwrap();
    }

    fn contents(history: &[ConversationTurn]) -> Vec<&str> {
        history.iter().map(|t| t.content.as_str()).collect()
    }

    #[tokio::test]
    async fn keeps_most_recent_pairs_in_order() {
        let memory = ShortMemoryBuffer::new(3);
        for message in ["a", "b", "c", "d"] {
            push(&memory, message).await;
        }

        let history = memory.history().await.unwrap();
        assert_eq!(
            contents(&history),
            vec!["b", "re: b", "c", "re: c", "d", "re: d"]
        );
    }

    #[tokio::test]
    async fn length_is_bounded_for_any_overflow() {
        for max_turns in 1..5 {
            let memory = ShortMemoryBuffer::new(max_turns);
            let total = max_turns + 7;
            for i in 0..total {
                push(&memory, &i.to_string()).await;
            }

            let history = memory.history().await.unwrap();
            assert_eq!(history.len(), 2 * max_turns);
            assert_eq!(memory.len().await.unwrap(), 2 * max_turns);

            let expected: Vec<String> = (total - max_turns..total)
                .flat_map(|i| [i.to_string(), format!("re: {}", i)])
                .collect();
            assert_eq!(contents(&history), expected);
        }
    }

    #[tokio::test]
    async fn zero_bound_keeps_nothing() {
        let memory = ShortMemoryBuffer::new(0);
        push(&memory, "a").await;
        assert!(memory.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let memory = ShortMemoryBuffer::new(2);
        push(&memory, "a").await;
        memory.clear().await.unwrap();
        assert!(memory.history().await.unwrap().is_empty());
    }
}
