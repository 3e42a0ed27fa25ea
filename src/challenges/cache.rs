//! Time-boxed read cache for the active-challenge listing
//!
//! A single slot holding the last fetched (or fallback) list together with
//! the instant it was stored. The slot is replaced wholesale on every
//! successful fetch and on every offline fallback, so repeated reads within
//! the window never re-attempt the remote fetch. Any successful challenge
//! creation invalidates it unconditionally.

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::model::Challenge;

/// Default cache window (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    challenges: Vec<Challenge>,
    stored_at: Instant,
}

/// Single-slot TTL cache for the active-challenge list
pub struct ChallengeCache {
    ttl: Duration,
    slot: RwLock<Option<CacheEntry>>,
}

impl ChallengeCache {
    /// Create a cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Get the cached list if it is still within the TTL window
    pub async fn get(&self) -> Option<Vec<Challenge>> {
        self.get_at(Instant::now()).await
    }

    /// Get with an explicit "now", for deterministic expiry tests
    pub async fn get_at(&self, now: Instant) -> Option<Vec<Challenge>> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                Some(entry.challenges.clone())
            }
            _ => None,
        }
    }

    /// Replace the slot wholesale
    pub async fn put(&self, challenges: Vec<Challenge>) {
        self.put_at(challenges, Instant::now()).await;
    }

    /// Replace with an explicit store time, for deterministic expiry tests
    pub async fn put_at(&self, challenges: Vec<Challenge>, stored_at: Instant) {
        let mut slot = self.slot.write().await;
        *slot = Some(CacheEntry {
            challenges,
            stored_at,
        });
    }

    /// Drop the slot, forcing the next read to refetch
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }
}

impl Default for ChallengeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenges::offline::builtin_challenges;

    #[tokio::test]
    async fn test_empty_cache_misses() {
        let cache = ChallengeCache::default();
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_hit_within_window() {
        let cache = ChallengeCache::new(Duration::from_secs(300));
        let list = builtin_challenges();
        cache.put(list.clone()).await;

        let cached = cache.get().await.expect("cache should hit");
        assert_eq!(cached.len(), list.len());
        assert_eq!(cached[0].id, list[0].id);
    }

    #[tokio::test]
    async fn test_miss_after_ttl_expires() {
        let cache = ChallengeCache::new(Duration::from_secs(300));
        let stored = Instant::now();
        cache.put_at(builtin_challenges(), stored).await;

        let just_before = stored + Duration::from_secs(299);
        assert!(cache.get_at(just_before).await.is_some());

        let just_after = stored + Duration::from_secs(301);
        assert!(cache.get_at(just_after).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_miss() {
        let cache = ChallengeCache::default();
        cache.put(builtin_challenges()).await;
        assert!(cache.get().await.is_some());

        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_wholesale() {
        let cache = ChallengeCache::default();
        cache.put(builtin_challenges()).await;
        cache.put(Vec::new()).await;

        let cached = cache.get().await.expect("cache should hit");
        assert!(cached.is_empty());
    }
}
