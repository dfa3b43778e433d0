use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::cache::Fingerprint;
use crate::error::{Error, Result};
use crate::traits::{CacheEntry, CacheStore};

/// In-process cache. With `max_entries` set, the oldest record is evicted
/// to make room for a new key.
pub struct MemoryCache {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    max_entries: Option<usize>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: None,
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max.max(1));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_if_needed(&self, entries: &mut HashMap<Fingerprint, CacheEntry>) {
        entries.retain(|_, e| !e.is_expired());

        let Some(max) = self.max_entries else {
            return;
        };
        while entries.len() >= max {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::cache("cache lock poisoned")
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .get(fingerprint)
            .filter(|e| !e.is_expired())
            .cloned())
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        response: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if !entries.contains_key(fingerprint) {
            self.evict_if_needed(&mut entries);
        }
        entries.insert(
            fingerprint.clone(),
            CacheEntry::new(fingerprint.clone(), response, ttl),
        );
        Ok(())
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .map_err(poisoned)?
            .remove(fingerprint)
            .is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChatMessage;

    fn key(text: &str) -> Fingerprint {
        Fingerprint::compute("ollama", "llama3.2", &[ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn stores_and_overwrites() {
        let cache = MemoryCache::new();
        cache.put(&key("a"), "one", None).await.unwrap();
        cache.put(&key("a"), "two", None).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("a")).await.unwrap().unwrap().response, "two");
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.put(&key("a"), "one", Some(Duration::from_secs(5))).await.unwrap();

        {
            let mut entries = cache.entries.write().unwrap();
            let entry = entries.get_mut(&key("a")).unwrap();
            entry.created_at = entry.created_at - chrono::Duration::seconds(30);
        }

        assert!(cache.get(&key("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn evicts_oldest_when_full() {
        let cache = MemoryCache::new().with_max_entries(2);
        cache.put(&key("a"), "A", None).await.unwrap();
        cache.put(&key("b"), "B", None).await.unwrap();
        {
            let mut entries = cache.entries.write().unwrap();
            let entry = entries.get_mut(&key("a")).unwrap();
            entry.created_at = entry.created_at - chrono::Duration::seconds(30);
        }
        cache.put(&key("c"), "C", None).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).await.unwrap().is_none());
        assert!(cache.get(&key("b")).await.unwrap().is_some());
        assert!(cache.get(&key("c")).await.unwrap().is_some());
    }
}
