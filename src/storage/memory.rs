//! In-memory `ConfigStore`, for tests and the CLI's offline mode.
//!
//! Holds a single [`ConfigSnapshot`] behind a `Mutex` so it can be
//! mutated between requests (e.g. a test flipping a type's `enabled`
//! flag) while still satisfying `Send + Sync`. Each `fetch` clones the
//! current snapshot, filtered to the requested scopes — this store never
//! caches anything beyond what the caller explicitly set.

use std::sync::Mutex;

use crate::config::{ConfigSnapshot, ConfigStore, DetectorScope};
use crate::error::{ConfigError, Result};

/// A `ConfigStore` backed by an in-process snapshot.
pub struct InMemoryConfigStore {
    snapshot: Mutex<ConfigSnapshot>,
}

impl InMemoryConfigStore {
    /// Wraps `snapshot` as a store.
    #[must_use]
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Replaces the stored snapshot wholesale, simulating an operator
    /// editing the backing store between requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a prior panic while
    /// holding the lock), matching `std::sync::Mutex`'s normal contract.
    pub fn replace(&self, snapshot: ConfigSnapshot) {
        *self.snapshot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = snapshot;
    }
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new(ConfigSnapshot::default())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn fetch(&self, scopes: &[DetectorScope]) -> Result<ConfigSnapshot, ConfigError> {
        let current = self
            .snapshot
            .lock()
            .map_err(|_| ConfigError::StoreUnreachable("in-memory store mutex poisoned".to_string()))?;

        if scopes.iter().any(|s| matches!(s, DetectorScope::All)) {
            return Ok(current.clone());
        }

        let per_type = current.per_type.iter().filter(|(_, cfg)| scopes.iter().any(|s| s.includes(cfg.detector))).map(|(k, v)| (k.clone(), v.clone())).collect();

        Ok(ConfigSnapshot {
            global: current.global.clone(),
            per_type,
        })
    }
}
