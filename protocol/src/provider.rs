//! Provider descriptors.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::ContextType;
use crate::error::ProtocolError;

/// Kind of system a provider fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    /// Electronic health record system.
    EhrSystem,

    /// Laboratory information system.
    LabSystem,

    /// Imaging archive (PACS).
    ImagingSystem,

    /// Pharmacy management system.
    PharmacySystem,

    /// Reasoning model consuming and producing context.
    AiModel,
}

impl ProviderType {
    /// Every provider type.
    pub const ALL: [ProviderType; 5] = [
        ProviderType::EhrSystem,
        ProviderType::LabSystem,
        ProviderType::ImagingSystem,
        ProviderType::PharmacySystem,
        ProviderType::AiModel,
    ];

    /// The wire tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::EhrSystem => "ehr-system",
            ProviderType::LabSystem => "lab-system",
            ProviderType::ImagingSystem => "imaging-system",
            ProviderType::PharmacySystem => "pharmacy-system",
            ProviderType::AiModel => "ai-model",
        }
    }

    /// Whether this provider is a reasoning model rather than a data source.
    pub fn is_model(self) -> bool {
        self == ProviderType::AiModel
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownProviderType(s.to_string()))
    }
}

/// A registered data source or reasoning model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Unique identifier, also the registry key.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// Where the provider is reached.
    pub endpoint: String,

    /// Free-form capability labels.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Context types this provider can issue.
    #[serde(default)]
    pub supported_context_types: Vec<ContextType>,

    /// Compliance regimes the provider operates under.
    #[serde(default)]
    pub compliance: Vec<String>,

    pub version: String,
}

impl Provider {
    /// Create a provider with no capabilities or supported types.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider_type: ProviderType,
    ) -> Self {
        let id = id.into();
        Self {
            endpoint: format!("/api/mcp/{id}"),
            id,
            name: name.into(),
            provider_type,
            capabilities: Vec::new(),
            supported_context_types: Vec::new(),
            compliance: Vec::new(),
            version: "1.0".to_string(),
        }
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the capability labels.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the supported context types.
    pub fn with_supported_types(mut self, types: impl IntoIterator<Item = ContextType>) -> Self {
        self.supported_context_types = types.into_iter().collect();
        self
    }

    /// Set the compliance regimes.
    pub fn with_compliance<I, S>(mut self, compliance: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compliance = compliance.into_iter().map(Into::into).collect();
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Whether the provider can issue `context_type`.
    pub fn supports(&self, context_type: ContextType) -> bool {
        self.supported_context_types.contains(&context_type)
    }

    /// The requested types this provider cannot issue.
    ///
    /// Request order is kept and duplicates are reported once.
    pub fn unsupported(&self, requested: &[ContextType]) -> Vec<ContextType> {
        let mut unsupported = Vec::new();
        for &context_type in requested {
            if !self.supports(context_type) && !unsupported.contains(&context_type) {
                unsupported.push(context_type);
            }
        }
        unsupported
    }
}
