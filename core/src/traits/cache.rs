use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::Fingerprint;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub response: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "ttl_secs", with = "ttl_secs")]
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, response: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            fingerprint,
            response: response.into(),
            created_at: Utc::now(),
            ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.created_at) > ttl,
            Err(_) => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

mod ttl_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match ttl {
            Some(ttl) => s.serialize_some(&ttl.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

/// Fingerprint-keyed response store. `get` never returns an expired entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>>;

    /// Latest write for a fingerprint wins.
    async fn put(
        &self,
        fingerprint: &Fingerprint,
        response: &str,
        ttl: Option<Duration>,
    ) -> Result<()>;

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool>;

    async fn clear(&self) -> Result<()>;
}
