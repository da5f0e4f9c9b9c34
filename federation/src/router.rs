//! Context router.
//!
//! Validates a request against the provider's capabilities, dispatches it to
//! the generator for the provider's type and records the result in the
//! cache.

use carelink_protocol::{Context, ContextFilters, ContextType};
use tracing::{debug, warn};

use crate::cache::{CacheKey, ContextCache};
use crate::error::{FederationError, Result};
use crate::generator::GeneratorSet;
use crate::registry::ProviderRegistry;

/// Routes context requests to generators.
#[derive(Clone)]
pub struct ContextRouter {
    registry: ProviderRegistry,
    generators: GeneratorSet,
    cache: ContextCache,
}

impl ContextRouter {
    /// Create a router over shared registry and cache handles.
    pub fn new(registry: ProviderRegistry, generators: GeneratorSet, cache: ContextCache) -> Self {
        Self {
            registry,
            generators,
            cache,
        }
    }

    /// Request contexts of the given types from a provider.
    ///
    /// Every call regenerates the contexts and overwrites the cache entry for
    /// `(provider_id, context_types)`.
    pub async fn request_context(
        &self,
        provider_id: &str,
        context_types: &[ContextType],
        filters: &ContextFilters,
    ) -> Result<Vec<Context>> {
        let provider = self
            .registry
            .get(provider_id)
            .await
            .ok_or_else(|| FederationError::NotFound(provider_id.to_string()))?;

        let unsupported = provider.unsupported(context_types);
        if !unsupported.is_empty() {
            return Err(FederationError::UnsupportedContextType {
                provider_id: provider_id.to_string(),
                unsupported,
            });
        }

        let generator = self
            .generators
            .get(provider.provider_type)
            .ok_or(FederationError::GeneratorMissing(provider.provider_type))?;

        let mut contexts = Vec::new();
        for &context_type in context_types {
            let generated = generator.generate(&provider, context_type, filters).await?;
            contexts.extend(generated);
        }

        let before = contexts.len();
        contexts.retain(|c| provider.supports(c.context_type));
        if contexts.len() < before {
            warn!(
                "Dropped {} contexts of unsupported types from {provider_id}",
                before - contexts.len()
            );
        }

        debug!(
            "Retrieved {} contexts from {provider_id} ({} types)",
            contexts.len(),
            context_types.len()
        );

        self.cache
            .put(CacheKey::new(provider_id, context_types), contexts.clone())
            .await;

        Ok(contexts)
    }
}
