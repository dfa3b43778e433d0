use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::traits::{ConversationTurn, Memory};

/// Clears the wrapped memory once `ttl` has passed since the last reset.
///
/// Expiry is lazy: it is only checked when `history` or `append` is
/// called, so an untouched memory keeps its turns until the next access.
pub struct ExpiringMemory {
    inner: Arc<dyn Memory>,
    ttl: Duration,
    last_reset: Mutex<Instant>,
}

impl ExpiringMemory {
    pub fn new(inner: Arc<dyn Memory>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            last_reset: Mutex::new(Instant::now()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn expire_if_stale(&self, last_reset: &mut Instant) -> anyhow::Result<()> {
        if last_reset.elapsed() > self.ttl {
            debug!("{} memory idle for over {:?}, clearing", self.inner.name(), self.ttl);
            self.inner.clear().await?;
            *last_reset = Instant::now();
        }
        Ok(())
    }
}

#[async_trait]
impl Memory for ExpiringMemory {
    fn name(&self) -> &str {
        "expiring"
    }

    async fn history(&self) -> anyhow::Result<Vec<ConversationTurn>> {
        let mut last_reset = self.last_reset.lock().await;
        self.expire_if_stale(&mut last_reset).await?;
        self.inner.history().await
    }

    async fn append(
        &self,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> anyhow::Result<()> {
        let mut last_reset = self.last_reset.lock().await;
        self.expire_if_stale(&mut last_reset).await?;
        self.inner.append(user, assistant).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut last_reset = self.last_reset.lock().await;
        self.inner.clear().await?;
        *last_reset = Instant::now();
        Ok(())
    }
}
