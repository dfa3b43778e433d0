pub mod file;
pub mod fingerprint;
pub mod memory;

pub use file::FileCache;
pub use fingerprint::Fingerprint;
pub use memory::MemoryCache;

use std::sync::Arc;

use crate::config::{CacheBackendKind, CacheConfig};
use crate::error::Result;
use crate::traits::CacheStore;

/// `None` when caching is switched off.
pub async fn create_cache(config: &CacheConfig) -> Result<Option<Arc<dyn CacheStore>>> {
    if !config.enabled {
        return Ok(None);
    }

    let cache: Arc<dyn CacheStore> = match config.backend {
        CacheBackendKind::File => Arc::new(FileCache::open(&config.dir).await?),
        CacheBackendKind::Memory => {
            let mut cache = MemoryCache::new();
            if let Some(max) = config.max_entries {
                cache = cache.with_max_entries(max);
            }
            Arc::new(cache)
        }
    };

    Ok(Some(cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn factory_respects_backend_and_switch() {
        let tmp = TempDir::new().unwrap();
        let mut config = CacheConfig {
            dir: tmp.path().join("cache"),
            ..Default::default()
        };

        let cache = create_cache(&config).await.unwrap().unwrap();
        assert_eq!(cache.name(), "file");
        assert!(tmp.path().join("cache").is_dir());

        config.backend = CacheBackendKind::Memory;
        let cache = create_cache(&config).await.unwrap().unwrap();
        assert_eq!(cache.name(), "memory");

        config.enabled = false;
        assert!(create_cache(&config).await.unwrap().is_none());
    }
}
