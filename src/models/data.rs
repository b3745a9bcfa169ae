use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DOSAGE_NOT_SPECIFIED: &str = "As prescribed";
pub const FREQUENCY_NOT_SPECIFIED: &str = "As directed";
pub const DURATION_NOT_SPECIFIED: &str = "As prescribed";

/// Stages an analysis moves through. `NoText` and `Error` are terminal
/// failure states; `Done` is the only terminal success state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Start,
    Preprocessing,
    Ocr,
    NoText,
    FieldExtraction,
    MedicineExtraction,
    Scoring,
    Done,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: String,
    pub age: String,
    pub gender: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub name: String,
    pub specialization: String,
    pub registration_number: String,
}

/// Which extraction strategy produced a medicine entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    DatabaseMatch,
    Pattern,
    LineAnalysis,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::DatabaseMatch => "database_match",
            ExtractionMethod::Pattern => "pattern",
            ExtractionMethod::LineAnalysis => "line_analysis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineEntry {
    pub name: String,
    pub generic: String,
    pub category: String,
    pub available: bool,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
    /// Knowledge-base key a fuzzy enrichment resolved to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub matched_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub match_score: Option<f64>,
}

impl MedicineEntry {
    /// A fresh, not yet enriched entry.
    pub fn new(name: &str, confidence: f64, method: ExtractionMethod) -> Self {
        MedicineEntry {
            name: name.to_string(),
            generic: String::new(),
            category: "unknown".to_string(),
            available: true,
            dosage: DOSAGE_NOT_SPECIFIED.to_string(),
            frequency: FREQUENCY_NOT_SPECIFIED.to_string(),
            duration: DURATION_NOT_SPECIFIED.to_string(),
            instructions: String::new(),
            confidence,
            extraction_method: method,
            matched_key: None,
            match_score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub prescription_id: String,
    pub stage: AnalysisStage,
    pub patient: PatientInfo,
    pub doctor: DoctorInfo,
    pub medicines: Vec<MedicineEntry>,
    pub diagnosis: Vec<String>,
    pub confidence_score: f64,
    pub raw_text: String,
    pub error: String,
    pub timestamp: String,
}

impl AnalysisResult {
    /// An empty record with a fresh `RX-XXXXXXXX` identifier.
    pub fn new() -> Self {
        AnalysisResult {
            success: false,
            prescription_id: generate_prescription_id(),
            stage: AnalysisStage::Start,
            patient: PatientInfo::default(),
            doctor: DoctorInfo::default(),
            medicines: Vec::new(),
            diagnosis: Vec::new(),
            confidence_score: 0.0,
            raw_text: String::new(),
            error: String::new(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn fail(&mut self, stage: AnalysisStage, message: impl Into<String>) {
        self.success = false;
        self.stage = stage;
        self.error = message.into();
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::new()
    }
}

pub fn generate_prescription_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("RX-{}", hex[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescription_id_format() {
        let id = generate_prescription_id();
        assert_eq!(id.len(), 11);
        assert!(id.starts_with("RX-"));
        assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_new_result_is_empty() {
        let result = AnalysisResult::new();
        assert!(!result.success);
        assert_eq!(result.stage, AnalysisStage::Start);
        assert_eq!(result.patient, PatientInfo::default());
        assert!(result.medicines.is_empty());
        assert!(result.error.is_empty());
        assert_ne!(result.prescription_id, AnalysisResult::new().prescription_id);
    }

    #[test]
    fn test_extraction_method_serializes_as_tag() {
        let json = serde_json::to_string(&ExtractionMethod::LineAnalysis).unwrap();
        assert_eq!(json, "\"line_analysis\"");
        assert_eq!(ExtractionMethod::DatabaseMatch.as_str(), "database_match");
    }

    #[test]
    fn test_fresh_medicine_entry_defaults() {
        let entry = MedicineEntry::new("Xyzmedicine", 0.7, ExtractionMethod::Pattern);
        assert_eq!(entry.category, "unknown");
        assert!(entry.available);
        assert!(entry.generic.is_empty());
        assert_eq!(entry.dosage, DOSAGE_NOT_SPECIFIED);
    }
}
