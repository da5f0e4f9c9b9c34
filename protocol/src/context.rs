//! Context entries and the filters used to request them.
//!
//! A [`Context`] is created once per request by the provider that issued it
//! and is never modified afterwards; holders pass clones around.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Category of clinical context.
///
/// Ordering follows declaration order, which is also the order used when
/// reporting the union of supported types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextType {
    /// Conditions, surgeries and family history.
    MedicalHistory,

    /// Encounter notes.
    ClinicalNotes,

    /// Laboratory test results.
    LabResults,

    /// Imaging studies and reports.
    Imaging,

    /// Current and historical medications.
    Medications,

    /// Known allergies.
    Allergies,
}

impl ContextType {
    /// Every context type, in declaration order.
    pub const ALL: [ContextType; 6] = [
        ContextType::MedicalHistory,
        ContextType::ClinicalNotes,
        ContextType::LabResults,
        ContextType::Imaging,
        ContextType::Medications,
        ContextType::Allergies,
    ];

    /// The wire tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ContextType::MedicalHistory => "medical-history",
            ContextType::ClinicalNotes => "clinical-notes",
            ContextType::LabResults => "lab-results",
            ContextType::Imaging => "imaging",
            ContextType::Medications => "medications",
            ContextType::Allergies => "allergies",
        }
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownContextType(s.to_string()))
    }
}

/// Clinical urgency attached to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Confidence score bounded to `[0, 1]`.
///
/// [`Confidence::new`] clamps; decoding from the wire rejects values outside
/// the range instead.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Full confidence.
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// Create a confidence score, clamping into `[0, 1]`. NaN maps to zero.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// The raw score.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::CERTAIN
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ProtocolError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ProtocolError::ConfidenceOutOfRange(value))
        }
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// Descriptive metadata attached to a context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,

    /// Compliance regimes the context was produced under (HIPAA, CLIA, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_level: Vec<String>,
}

impl ContextMetadata {
    /// Metadata scoped to a patient, if one is known.
    pub fn for_patient(patient_id: Option<String>) -> Self {
        Self {
            patient_id,
            ..Default::default()
        }
    }

    /// Set the issuing provider.
    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Set the encounter type.
    pub fn with_encounter_type(mut self, encounter_type: impl Into<String>) -> Self {
        self.encounter_type = Some(encounter_type.into());
        self
    }

    /// Set the specialty.
    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    /// Set the urgency.
    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    /// Set the compliance levels.
    pub fn with_compliance<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compliance_level = levels.into_iter().map(Into::into).collect();
        self
    }
}

/// One normalized fact bundle sourced from a single clinical system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Unique identifier (`ctx_<uuid>`).
    pub id: String,

    /// Category of this context.
    #[serde(rename = "type")]
    pub context_type: ContextType,

    /// Opaque structured payload.
    pub content: Value,

    /// When the context was produced.
    pub timestamp: DateTime<Utc>,

    /// Id of the provider that issued the context.
    pub source: String,

    /// Confidence in the content.
    pub confidence: Confidence,

    pub metadata: ContextMetadata,
}

impl Context {
    /// Create a context issued now by `source`.
    pub fn new(context_type: ContextType, source: impl Into<String>, content: Value) -> Self {
        Self {
            id: Self::generate_id(),
            context_type,
            content,
            timestamp: Utc::now(),
            source: source.into(),
            confidence: Confidence::default(),
            metadata: ContextMetadata::default(),
        }
    }

    /// Generate a fresh context identifier.
    pub fn generate_id() -> String {
        crate::prefixed_id("ctx")
    }

    /// Set the confidence (clamped into `[0, 1]`).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Confidence::new(confidence);
        self
    }

    /// Set the metadata.
    pub fn with_metadata(mut self, metadata: ContextMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Patient the context belongs to, if recorded.
    pub fn patient_id(&self) -> Option<&str> {
        self.metadata.patient_id.as_deref()
    }
}

/// Free-form filters passed through to generators.
///
/// `patientId` is the only key the engine itself understands; every other
/// key is kept verbatim for provider adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContextFilters {
    /// Filters scoped to one patient.
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            extra: Map::new(),
        }
    }

    /// Add an adapter-specific filter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up an adapter-specific filter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_context_type_tags() {
        for context_type in ContextType::ALL {
            let parsed: ContextType = context_type.as_str().parse().unwrap();
            assert_eq!(parsed, context_type);
        }
        assert_eq!(
            serde_json::to_value(ContextType::LabResults).unwrap(),
            json!("lab-results")
        );
        assert!("vitals".parse::<ContextType>().is_err());
    }

    #[test]
    fn test_confidence_clamps_on_construction() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::new(0.42).value(), 0.42);
    }

    #[test]
    fn test_confidence_rejects_out_of_range_on_decode() {
        let raw = json!({
            "id": "ctx_1",
            "type": "imaging",
            "content": {},
            "timestamp": "2024-05-01T12:00:00Z",
            "source": "pacs-imaging",
            "confidence": 1.5,
            "metadata": {}
        });
        assert!(serde_json::from_value::<Context>(raw).is_err());
    }

    #[test]
    fn test_context_wire_shape() {
        let context = Context::new(
            ContextType::MedicalHistory,
            "epic-ehr",
            json!({ "conditions": ["Hypertension"] }),
        )
        .with_confidence(0.95)
        .with_metadata(
            ContextMetadata::for_patient(Some("p-42".to_string())).with_compliance(["HIPAA"]),
        );

        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(value["type"], json!("medical-history"));
        assert_eq!(value["confidence"], json!(0.95));
        assert_eq!(value["metadata"]["patientId"], json!("p-42"));
        assert_eq!(value["metadata"]["complianceLevel"], json!(["HIPAA"]));
        assert!(context.id.starts_with("ctx_"));

        let back: Context = serde_json::from_value(value).unwrap();
        assert_eq!(back, context);
    }

    #[test]
    fn test_filters_keep_extra_keys() {
        let filters: ContextFilters =
            serde_json::from_value(json!({ "patientId": "p-1", "since": "2024-01-01" })).unwrap();
        assert_eq!(filters.patient_id.as_deref(), Some("p-1"));
        assert_eq!(filters.get("since"), Some(&json!("2024-01-01")));
    }
}
