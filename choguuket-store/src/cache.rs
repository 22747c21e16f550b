use async_trait::async_trait;
use choguuket_core::repository::SearchCache;
use choguuket_core::{CacheError, MatchSet, RequestId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    matches: MatchSet,
    inserted_at: Instant,
    expires_at: Instant,
}

/// Process-local [`SearchCache`] with per-entry TTL and a hard entry cap.
///
/// Expired entries are dropped lazily on read and swept on every write. When the cap is
/// reached the oldest live entry is evicted.
pub struct MemorySearchCache {
    entries: Mutex<HashMap<RequestId, Entry>>,
    max_entries: usize,
}

impl MemorySearchCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SearchCache for MemorySearchCache {
    async fn set(&self, id: RequestId, matches: &MatchSet, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.expires_at > now);

        if entries.len() >= self.max_entries && !entries.contains_key(&id) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| *key);
            if let Some(key) = oldest {
                debug!("Search cache full, evicting request {}", key);
                entries.remove(&key);
            }
        }

        entries.insert(
            id,
            Entry {
                matches: matches.clone(),
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<MatchSet>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired = match entries.get(&id) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.matches.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(&id);
        }
        Ok(None)
    }
}
