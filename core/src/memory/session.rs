use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::memory::lock_poisoned;
use crate::traits::{ConversationTurn, Memory};

pub type MemoryFactory = Arc<dyn Fn() -> Arc<dyn Memory> + Send + Sync>;

pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Independent memories keyed by session id, created on first use.
///
/// The map is a bounded LRU: once `max_sessions` is reached, the session
/// touched least recently is dropped to make room.
pub struct SessionMemoryManager {
    factory: MemoryFactory,
    sessions: Mutex<LruCache<String, Arc<dyn Memory>>>,
}

impl SessionMemoryManager {
    pub fn new(factory: MemoryFactory) -> Self {
        Self::with_max_sessions(factory, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_max_sessions(factory: MemoryFactory, max_sessions: usize) -> Self {
        let cap = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            factory,
            sessions: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn unbounded(factory: MemoryFactory) -> Self {
        Self {
            factory,
            sessions: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Memory for `session_id`, created through the factory if absent.
    pub fn session(&self, session_id: &str) -> anyhow::Result<Arc<dyn Memory>> {
        let mut sessions = self.sessions.lock().map_err(lock_poisoned)?;
        if let Some(memory) = sessions.get(session_id) {
            return Ok(memory.clone());
        }

        let memory = (self.factory)();
        if let Some((evicted, _)) = sessions.push(session_id.to_string(), memory.clone())
            && evicted != session_id
        {
            info!("Evicted least recently used session {}", evicted);
        }
        info!("Created {} memory for session {}", memory.name(), session_id);
        Ok(memory)
    }

    /// A `Memory` view bound to one session.
    pub fn scoped(self: &Arc<Self>, session_id: impl Into<String>) -> SessionMemory {
        SessionMemory {
            manager: self.clone(),
            session_id: session_id.into(),
        }
    }

    pub async fn history(&self, session_id: &str) -> anyhow::Result<Vec<ConversationTurn>> {
        self.session(session_id)?.history().await
    }

    pub async fn append(
        &self,
        session_id: &str,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> anyhow::Result<()> {
        self.session(session_id)?.append(user, assistant).await
    }

    pub async fn clear(&self, session_id: &str) -> anyhow::Result<()> {
        self.session(session_id)?.clear().await
    }

    pub fn remove(&self, session_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .sessions
            .lock()
            .map_err(lock_poisoned)?
            .pop(session_id)
            .is_some())
    }

    pub fn session_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .sessions
            .lock()
            .map_err(lock_poisoned)?
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct SessionMemory {
    manager: Arc<SessionMemoryManager>,
    session_id: String,
}

impl SessionMemory {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl Memory for SessionMemory {
    fn name(&self) -> &str {
        "session"
    }

    async fn history(&self) -> anyhow::Result<Vec<ConversationTurn>> {
        self.manager.history(&self.session_id).await
    }

    async fn append(
        &self,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> anyhow::Result<()> {
        self.manager.append(&self.session_id, user, assistant).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.manager.clear(&self.session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ShortMemoryBuffer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn buffer_factory() -> MemoryFactory {
        Arc::new(|| Arc::new(ShortMemoryBuffer::new(5)) as Arc<dyn Memory>)
    }

    fn pair(text: &str) -> (ConversationTurn, ConversationTurn) {
        (ConversationTurn::user(text), ConversationTurn::assistant("ok"))
    }

    #[tokio::test]
    async fn sessions_do_not_share_state() {
        let manager = SessionMemoryManager::new(buffer_factory());
        let (u, a) = pair("for alice");
        manager.append("alice", u, a).await.unwrap();

        assert_eq!(manager.history("alice").await.unwrap().len(), 2);
        assert!(manager.history("bob").await.unwrap().is_empty());

        manager.clear("bob").await.unwrap();
        assert_eq!(manager.history("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn factory_runs_once_per_session() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let manager = SessionMemoryManager::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(ShortMemoryBuffer::new(5)) as Arc<dyn Memory>
        }));

        manager.session("a").unwrap();
        manager.session("a").unwrap();
        manager.session("b").unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_session() {
        let manager = SessionMemoryManager::with_max_sessions(buffer_factory(), 2);
        for id in ["a", "b"] {
            let (u, a) = pair(id);
            manager.append(id, u, a).await.unwrap();
        }

        // Touch "a" so "b" becomes the eviction candidate.
        manager.history("a").await.unwrap();
        manager.session("c").unwrap();

        let mut ids = manager.session_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(manager.history("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scoped_view_acts_as_memory() {
        let manager = Arc::new(SessionMemoryManager::unbounded(buffer_factory()));
        let scoped = manager.scoped("s1");
        let (u, a) = pair("hi");
        scoped.append(u, a).await.unwrap();

        assert_eq!(scoped.session_id(), "s1");
        assert_eq!(manager.history("s1").await.unwrap().len(), 2);
        assert!(manager.remove("s1").unwrap());
        assert!(scoped.history().await.unwrap().is_empty());
    }
}
