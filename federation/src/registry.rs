//! Provider registry.
//!
//! The `ProviderRegistry` holds every known data source and reasoning model,
//! keyed by provider id. Clones share the same underlying map.

use std::sync::Arc;

use carelink_protocol::{ContextType, Provider, ProviderType};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{FederationError, Result};

/// Runtime registry of providers.
///
/// Listing order is registration order; re-registering an id replaces the
/// descriptor in place.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<IndexMap<String, Provider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous descriptor with the same id.
    ///
    /// Returns the descriptor that was replaced, if any. Nothing is merged.
    pub async fn register(&self, provider: Provider) -> Option<Provider> {
        let id = provider.id.clone();
        let previous = self.providers.write().await.insert(id.clone(), provider);

        if previous.is_some() {
            debug!("Replaced provider: {id}");
        } else {
            debug!("Registered provider: {id}");
        }
        previous
    }

    /// Register several providers in order.
    pub async fn register_all(&self, providers: impl IntoIterator<Item = Provider>) {
        let mut map = self.providers.write().await;
        let mut count = 0usize;
        for provider in providers {
            map.insert(provider.id.clone(), provider);
            count += 1;
        }
        info!("Registered {count} providers");
    }

    /// Remove a provider.
    pub async fn unregister(&self, id: &str) -> Result<Provider> {
        let removed = self
            .providers
            .write()
            .await
            .shift_remove(id)
            .ok_or_else(|| FederationError::NotFound(id.to_string()))?;

        debug!("Unregistered provider: {id}");
        Ok(removed)
    }

    /// Get a provider by id.
    pub async fn get(&self, id: &str) -> Option<Provider> {
        self.providers.read().await.get(id).cloned()
    }

    /// Whether a provider is registered.
    pub async fn contains(&self, id: &str) -> bool {
        self.providers.read().await.contains_key(id)
    }

    /// List all providers.
    pub async fn list(&self) -> Vec<Provider> {
        self.providers.read().await.values().cloned().collect()
    }

    /// List providers of one type.
    pub async fn list_by_type(&self, provider_type: ProviderType) -> Vec<Provider> {
        self.providers
            .read()
            .await
            .values()
            .filter(|p| p.provider_type == provider_type)
            .cloned()
            .collect()
    }

    /// Number of registered providers.
    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }

    /// Union of every provider's supported context types.
    pub async fn supported_context_types(&self) -> Vec<ContextType> {
        let mut types: Vec<ContextType> = self
            .providers
            .read()
            .await
            .values()
            .flat_map(|p| p.supported_context_types.iter().copied())
            .collect();
        types.sort();
        types.dedup();
        types
    }
}
