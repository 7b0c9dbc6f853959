//! Short-lived cache of successful remote verdicts.
//!
//! Entries are keyed by the SHA-256 of the configured credential header so raw
//! credentials are never held in memory longer than the request.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::error;

use crate::model::Identity;

type CacheKey = [u8; 32];

/// TTL cache of identities returned by a remote endpoint.
#[derive(Debug)]
pub struct AuthCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Identity)>>,
}

impl AuthCache {
    /// Cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Digest a credential value into a cache key.
    #[must_use]
    pub fn key_for(credential: &[u8]) -> CacheKey {
        Sha256::digest(credential).into()
    }

    /// Identity cached under `key`, if present and unexpired.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Identity> {
        self.get_at(key, Instant::now())
    }

    /// Store a successful verdict.
    pub fn insert(&self, key: CacheKey, identity: Identity) {
        self.insert_at(key, identity, Instant::now());
    }

    /// Number of live and expired entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Identity> {
        let entries = self.lock();
        entries
            .get(key)
            .filter(|(expires, _)| *expires > now)
            .map(|(_, identity)| identity.clone())
    }

    fn insert_at(&self, key: CacheKey, identity: Identity, now: Instant) {
        let mut entries = self.lock();
        entries.retain(|_, (expires, _)| *expires > now);
        entries.insert(key, (now + self.ttl, identity));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, (Instant, Identity)>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("auth cache mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}
