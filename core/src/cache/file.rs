use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::cache::Fingerprint;
use crate::error::{Error, Result};
use crate::traits::{CacheEntry, CacheStore};

/// One JSON record per fingerprint under `dir`, named `<hex>.json`.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            Error::cache(format!("Failed to create cache directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint))
    }

    async fn read_record(&self, path: &Path) -> Result<Option<CacheEntry>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::cache(format!("Failed to read {}: {}", path.display(), e)));
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::cache(format!("Corrupt cache record {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl CacheStore for FileCache {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        let Some(entry) = self.read_record(&self.record_path(fingerprint)).await? else {
            return Ok(None);
        };

        // Stale records stay on disk until the key is written again.
        if entry.is_expired() {
            debug!("Cache record {} expired", fingerprint);
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        response: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let path = self.record_path(fingerprint);
        let entry = CacheEntry::new(fingerprint.clone(), response, ttl);
        let bytes = serde_json::to_vec_pretty(&entry).map_err(Error::cache)?;

        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", fingerprint, uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::cache(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::cache(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(())
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        match fs::remove_file(self.record_path(fingerprint)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::cache(e)),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(Error::cache)?;

        while let Some(entry) = entries.next_entry().await.map_err(Error::cache)? {
            let path = entry.path();
            // Records and leftover temp files both start with the fingerprint.
            let is_record = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.split('.').next())
                .and_then(Fingerprint::parse)
                .is_some();

            if is_record {
                fs::remove_file(&path).await.map_err(Error::cache)?;
            }
        }

        Ok(())
    }
}
