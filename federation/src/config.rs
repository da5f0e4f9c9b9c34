//! Configuration for the federation engine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{FederationError, Result};

/// Configuration for a [`FederationHub`](crate::FederationHub).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Sender id used for messages the engine originates.
    pub engine_id: String,

    /// Whether to register the built-in healthcare providers on startup.
    pub seed_default_providers: bool,

    /// Context cache configuration.
    pub cache: CacheConfig,

    /// Patient aggregation configuration.
    pub aggregation: AggregationConfig,

    /// Message handling configuration.
    pub messaging: MessagingConfig,

    /// HL7 output configuration.
    pub hl7: Hl7Config,
}

impl FederationConfig {
    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).await?;
        debug!("Loaded federation config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.engine_id.trim().is_empty() {
            return Err(FederationError::Config("engine_id must not be empty".to_string()));
        }
        if self.cache.max_entries == 0 {
            return Err(FederationError::Config(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.aggregation.max_concurrency == 0 {
            return Err(FederationError::Config(
                "aggregation.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.aggregation.provider_timeout_ms == 0 {
            return Err(FederationError::Config(
                "aggregation.provider_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the engine id.
    pub fn with_engine_id(mut self, engine_id: impl Into<String>) -> Self {
        self.engine_id = engine_id.into();
        self
    }

    /// Enable or disable default provider seeding.
    pub fn with_default_providers(mut self, seed: bool) -> Self {
        self.seed_default_providers = seed;
        self
    }

    /// Set the aggregation configuration.
    pub fn with_aggregation(mut self, aggregation: AggregationConfig) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Set the messaging configuration.
    pub fn with_messaging(mut self, messaging: MessagingConfig) -> Self {
        self.messaging = messaging;
        self
    }

    /// Set the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            engine_id: "mcp-service".to_string(),
            seed_default_providers: true,
            cache: CacheConfig::default(),
            aggregation: AggregationConfig::default(),
            messaging: MessagingConfig::default(),
            hl7: Hl7Config::default(),
        }
    }
}

/// Configuration for the context cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached context sets.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

/// How aggregation treats a failing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Log and skip failing providers; partial results are expected.
    #[default]
    BestEffort,

    /// Fail on the first provider error.
    Strict,
}

/// Configuration for patient context aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Failure policy for `FederationHub::aggregate_default`.
    /// `get_patient_context` is always best effort.
    pub mode: AggregationMode,

    /// Per-provider deadline in milliseconds.
    pub provider_timeout_ms: u64,

    /// Maximum number of providers queried at once.
    pub max_concurrency: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::BestEffort,
            provider_timeout_ms: 5_000,
            max_concurrency: 4,
        }
    }
}

/// Configuration for message handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Value of the `encryption` flag on originated messages.
    pub encryption: bool,

    /// Sign messages the engine originates.
    pub sign_messages: bool,

    /// Reject messages whose signature does not match their contents.
    pub verify_signatures: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            encryption: true,
            sign_messages: true,
            verify_signatures: true,
        }
    }
}

/// Application and facility names written into the HL7 `MSH` segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hl7Config {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
}

impl Default for Hl7Config {
    fn default() -> Self {
        Self {
            sending_application: "MCP".to_string(),
            sending_facility: "SYSTEM".to_string(),
            receiving_application: "AI".to_string(),
            receiving_facility: "MODEL".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FederationConfig::from_toml_str(
            r#"
            engine_id = "tenant-a"

            [aggregation]
            mode = "strict"
            provider_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.engine_id, "tenant-a");
        assert_eq!(config.aggregation.mode, AggregationMode::Strict);
        assert_eq!(config.aggregation.provider_timeout_ms, 250);
        assert_eq!(config.aggregation.max_concurrency, 4);
        assert_eq!(config.cache, CacheConfig::default());
        assert!(config.seed_default_providers);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = FederationConfig::from_toml_str("[cache]\nmax_entries = 0\n").unwrap_err();
        assert!(matches!(err, FederationError::Config(_)));

        let err = FederationConfig::from_toml_str("[aggregation]\nprovider_timeout_ms = 0\n")
            .unwrap_err();
        assert!(matches!(err, FederationError::Config(msg) if msg.contains("provider_timeout_ms")));

        let no_timeout = FederationConfig::default().with_aggregation(AggregationConfig {
            provider_timeout_ms: 0,
            ..Default::default()
        });
        assert!(no_timeout.validate().is_err());

        let err = FederationConfig::from_toml_str("[aggregation]\nmode = \"eager\"\n").unwrap_err();
        assert!(matches!(err, FederationError::Toml(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("carelink.toml");
        tokio::fs::write(
            &path,
            "seed_default_providers = false\n[hl7]\nsending_facility = \"WARD-7\"\n",
        )
        .await
        .unwrap();

        let config = FederationConfig::load(&path).await.unwrap();
        assert!(!config.seed_default_providers);
        assert_eq!(config.hl7.sending_facility, "WARD-7");
        assert_eq!(config.hl7.sending_application, "MCP");
    }
}
