//! Context transformation for downstream AI consumption.
//!
//! Three output formats are supported:
//!
//! - **clinical-summary**: a plain-text digest plus the contexts grouped by category
//! - **fhir-bundle**: a FHIR R4 `collection` bundle with one mapped resource per context
//! - **hl7-message**: an HL7 v2.5 message with an `OBX` segment per lab result
//!
//! Any other format name passes the contexts through unchanged.

use carelink_protocol::{Context, ContextType, Message};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Hl7Config;
use crate::error::Result;

const NONE_DOCUMENTED: &str = "None documented";
const MAX_SUMMARY_NOTES: usize = 3;

/// Requested output format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetFormat {
    #[default]
    ClinicalSummary,
    FhirBundle,
    Hl7Message,
    /// Unrecognized name; the transform is the identity.
    Other(String),
}

impl TargetFormat {
    /// Parse a format name. Unknown names become [`TargetFormat::Other`].
    pub fn parse(name: &str) -> Self {
        match name {
            "clinical-summary" => TargetFormat::ClinicalSummary,
            "fhir-bundle" => TargetFormat::FhirBundle,
            "hl7-message" => TargetFormat::Hl7Message,
            other => TargetFormat::Other(other.to_string()),
        }
    }

    /// The format name.
    pub fn as_str(&self) -> &str {
        match self {
            TargetFormat::ClinicalSummary => "clinical-summary",
            TargetFormat::FhirBundle => "fhir-bundle",
            TargetFormat::Hl7Message => "hl7-message",
            TargetFormat::Other(name) => name,
        }
    }
}

impl From<&str> for TargetFormat {
    fn from(name: &str) -> Self {
        TargetFormat::parse(name)
    }
}

/// Result of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransformOutput {
    ClinicalSummary(ClinicalSummary),
    FhirBundle(FhirBundle),
    /// Segments joined with carriage returns.
    Hl7Message(String),
    Passthrough(Vec<Context>),
}

impl TransformOutput {
    /// Render the output as JSON. HL7 text becomes a JSON string.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Plain-text digest plus contexts grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalSummary {
    pub patient_summary: String,
    pub medical_history: Vec<Context>,
    pub current_medications: Vec<Context>,
    pub recent_labs: Vec<Context>,
    pub recent_imaging: Vec<Context>,
    pub clinical_notes: Vec<Context>,
}

/// FHIR R4 bundle of type `collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FhirBundle {
    pub resource_type: String,
    pub id: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub resource: FhirResource,
}

/// Minimal FHIR resource mapped from one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum FhirResource {
    Condition {
        id: String,
        subject: Reference,
        code: CodeableConcept,
    },
    MedicationStatement {
        id: String,
        subject: Reference,
        #[serde(rename = "medicationCodeableConcept")]
        medication_codeable_concept: CodeableConcept,
    },
    Basic {
        id: String,
        subject: Reference,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    pub text: String,
}

/// Converts aggregated context into AI-ready formats.
#[derive(Debug, Clone, Default)]
pub struct ContextTransformer {
    hl7: Hl7Config,
}

impl ContextTransformer {
    /// Create a transformer writing the given HL7 header names.
    pub fn new(hl7: Hl7Config) -> Self {
        Self { hl7 }
    }

    /// Transform `contexts` into `format`.
    pub fn transform(&self, contexts: Vec<Context>, format: &TargetFormat) -> TransformOutput {
        match format {
            TargetFormat::ClinicalSummary => {
                TransformOutput::ClinicalSummary(clinical_summary(contexts))
            }
            TargetFormat::FhirBundle => TransformOutput::FhirBundle(fhir_bundle(&contexts)),
            TargetFormat::Hl7Message => TransformOutput::Hl7Message(self.hl7_message(&contexts)),
            TargetFormat::Other(_) => TransformOutput::Passthrough(contexts),
        }
    }

    fn hl7_message(&self, contexts: &[Context]) -> String {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let header = format!(
            "MSH|^~\\&|{}|{}|{}|{}|{timestamp}||ADT^A08|{}|P|2.5",
            escape_hl7(&self.hl7.sending_application),
            escape_hl7(&self.hl7.sending_facility),
            escape_hl7(&self.hl7.receiving_application),
            escape_hl7(&self.hl7.receiving_facility),
            Message::generate_id(),
        );

        let mut segments = vec![header];
        let lab_results = contexts
            .iter()
            .filter(|c| c.context_type == ContextType::LabResults);
        for (set_id, context) in lab_results.enumerate() {
            let test = context.content.get("tests").and_then(|tests| tests.get(0));
            let field = |name: &str| {
                escape_hl7(&test.and_then(|t| t.get(name)).map(scalar_text).unwrap_or_default())
            };
            segments.push(format!(
                "OBX|{}|NM|{}||{}|{}|{}|{}|||F",
                set_id + 1,
                field("name"),
                field("value"),
                field("units"),
                field("reference"),
                field("flag"),
            ));
        }

        segments.join("\r")
    }
}

fn of_type(contexts: &[Context], context_type: ContextType) -> Vec<Context> {
    contexts
        .iter()
        .filter(|c| c.context_type == context_type)
        .cloned()
        .collect()
}

fn clinical_summary(contexts: Vec<Context>) -> ClinicalSummary {
    ClinicalSummary {
        patient_summary: summary_text(&contexts),
        medical_history: of_type(&contexts, ContextType::MedicalHistory),
        current_medications: of_type(&contexts, ContextType::Medications),
        recent_labs: of_type(&contexts, ContextType::LabResults),
        recent_imaging: of_type(&contexts, ContextType::Imaging),
        clinical_notes: of_type(&contexts, ContextType::ClinicalNotes),
    }
}

fn first_of(contexts: &[Context], context_type: ContextType) -> Option<&Context> {
    contexts.iter().find(|c| c.context_type == context_type)
}

fn summary_text(contexts: &[Context]) -> String {
    let mut lines = Vec::new();

    let conditions = first_of(contexts, ContextType::MedicalHistory)
        .and_then(|c| c.content.get("conditions"))
        .map(string_list)
        .unwrap_or_default();
    lines.push(format!("Medical History: {}", or_none(conditions.join(", "))));

    let medications: Vec<String> = first_of(contexts, ContextType::Medications)
        .and_then(|c| c.content.get("currentMedications"))
        .and_then(Value::as_array)
        .map(|meds| {
            meds.iter()
                .map(|m| {
                    ["name", "dose", "frequency"]
                        .iter()
                        .filter_map(|key| m.get(*key).map(scalar_text))
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default();
    lines.push(format!("Current Medications: {}", or_none(medications.join(", "))));

    let mut notes: Vec<&Context> = contexts
        .iter()
        .filter(|c| c.context_type == ContextType::ClinicalNotes)
        .collect();
    notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if notes.is_empty() {
        lines.push(format!("Recent Clinical Notes: {NONE_DOCUMENTED}"));
    } else {
        lines.push("Recent Clinical Notes:".to_string());
        for note in notes.into_iter().take(MAX_SUMMARY_NOTES) {
            let complaint = note
                .content
                .get("chiefComplaint")
                .map(scalar_text)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "No chief complaint".to_string());
            lines.push(format!("- {complaint}"));
        }
    }

    lines.join("\n")
}

fn fhir_bundle(contexts: &[Context]) -> FhirBundle {
    FhirBundle {
        resource_type: "Bundle".to_string(),
        id: Context::generate_id(),
        bundle_type: "collection".to_string(),
        entry: contexts
            .iter()
            .map(|context| BundleEntry {
                resource: to_fhir_resource(context),
            })
            .collect(),
    }
}

fn to_fhir_resource(context: &Context) -> FhirResource {
    let id = context.id.clone();
    let subject = Reference {
        reference: format!("Patient/{}", context.patient_id().unwrap_or("unknown")),
    };

    match context.context_type {
        ContextType::MedicalHistory => FhirResource::Condition {
            id,
            subject,
            code: CodeableConcept {
                text: context
                    .content
                    .get("conditions")
                    .and_then(|c| c.get(0))
                    .map(scalar_text)
                    .unwrap_or_else(|| "Unknown condition".to_string()),
            },
        },
        ContextType::Medications => FhirResource::MedicationStatement {
            id,
            subject,
            medication_codeable_concept: CodeableConcept {
                text: context
                    .content
                    .get("currentMedications")
                    .and_then(|m| m.get(0))
                    .and_then(|m| m.get("name"))
                    .map(scalar_text)
                    .unwrap_or_else(|| "Unknown medication".to_string()),
            },
        },
        _ => FhirResource::Basic { id, subject },
    }
}

fn or_none(text: String) -> String {
    if text.is_empty() {
        NONE_DOCUMENTED.to_string()
    } else {
        text
    }
}

/// Render a JSON scalar as plain text; `null` becomes empty.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(scalar_text)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Escape HL7 v2 delimiter characters in a field value.
fn escape_hl7(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => escaped.push_str("\\E\\"),
            '|' => escaped.push_str("\\F\\"),
            '^' => escaped.push_str("\\S\\"),
            '&' => escaped.push_str("\\T\\"),
            '~' => escaped.push_str("\\R\\"),
            '\r' | '\n' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}
