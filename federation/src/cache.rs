//! Context cache.
//!
//! Stores the last context set retrieved for each `(provider, context types)`
//! request. Every retrieval overwrites its entry; entries are never
//! deduplicated.

use std::collections::HashMap;
use std::sync::Arc;

use carelink_protocol::{Context, ContextType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Key of a cached context set.
///
/// The requested types are kept in request order, so `[a, b]` and `[b, a]`
/// are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider_id: String,
    pub context_types: Vec<ContextType>,
}

impl CacheKey {
    /// Create a cache key.
    pub fn new(provider_id: impl Into<String>, context_types: &[ContextType]) -> Self {
        Self {
            provider_id: provider_id.into(),
            context_types: context_types.to_vec(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.provider_id)?;
        for context_type in &self.context_types {
            write!(f, "-{context_type}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    contexts: Vec<Context>,
    stored_at: DateTime<Utc>,
    sequence: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    next_sequence: u64,
}

/// In-memory cache of retrieved context sets.
#[derive(Clone)]
pub struct ContextCache {
    state: Arc<RwLock<CacheState>>,

    /// Maximum number of cached sets.
    max_entries: usize,
}

impl ContextCache {
    /// Create a cache holding at most `max_entries` sets.
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            max_entries: max_entries.max(1),
        }
    }

    /// Store a context set, replacing any set under the same key.
    ///
    /// When a new key would exceed capacity, the least recently stored set
    /// is evicted first.
    pub async fn put(&self, key: CacheKey, contexts: Vec<Context>) {
        let mut state = self.state.write().await;

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            if let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(k, _)| k.clone())
            {
                state.entries.remove(&oldest);
                debug!("Evicted cached contexts: {oldest}");
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        debug!("Cached {} contexts under {key}", contexts.len());
        state.entries.insert(
            key,
            CacheEntry {
                contexts,
                stored_at: Utc::now(),
                sequence,
            },
        );
    }

    /// Get the context set stored under `key`.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<Context>> {
        self.state
            .read()
            .await
            .entries
            .get(key)
            .map(|entry| entry.contexts.clone())
    }

    /// When the set under `key` was stored.
    pub async fn stored_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.state.read().await.entries.get(key).map(|e| e.stored_at)
    }

    /// Whether a set is stored under `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Number of cached sets.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Drop every cached set.
    pub async fn clear(&self) {
        self.state.write().await.entries.clear();
        info!("Cleared context cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            entries: state.entries.len(),
            max_entries: self.max_entries,
            contexts: state.entries.values().map(|e| e.contexts.len()).sum(),
        }
    }
}

/// Statistics about the context cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cached sets.
    pub entries: usize,

    /// Maximum number of cached sets.
    pub max_entries: usize,

    /// Total contexts across all sets.
    pub contexts: usize,
}
