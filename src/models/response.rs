// External JSON shape handed to HTTP clients, including the flattened
// fields older clients still read.

use serde::Serialize;

use super::data::{AnalysisResult, DoctorInfo, MedicineEntry, PatientInfo};
use crate::utils::text::truncate_chars;

pub const EXTRACTED_TEXT_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub prescription_id: String,
    pub patient: PatientInfo,
    pub doctor: DoctorInfo,
    pub medicines: Vec<MedicineEntry>,
    pub diagnosis: Vec<String>,
    pub confidence_score: f64,
    pub extracted_text: String,
    pub error: String,
    pub timestamp: String,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_gender: String,
    pub doctor_name: String,
    pub doctor_license: String,
    pub message: String,
}

impl From<&AnalysisResult> for AnalysisResponse {
    fn from(result: &AnalysisResult) -> Self {
        let message = if result.success {
            "Analysis completed successfully".to_string()
        } else {
            result.error.clone()
        };

        AnalysisResponse {
            success: result.success,
            prescription_id: result.prescription_id.clone(),
            patient: result.patient.clone(),
            doctor: result.doctor.clone(),
            medicines: result.medicines.clone(),
            diagnosis: result.diagnosis.clone(),
            confidence_score: result.confidence_score,
            extracted_text: truncate_chars(&result.raw_text, EXTRACTED_TEXT_LIMIT),
            error: result.error.clone(),
            timestamp: result.timestamp.clone(),
            patient_name: result.patient.name.clone(),
            patient_age: result.patient.age.parse().unwrap_or(0),
            patient_gender: result.patient.gender.clone(),
            doctor_name: result.doctor.name.clone(),
            doctor_license: result.doctor.registration_number.clone(),
            message,
        }
    }
}

impl AnalysisResponse {
    pub fn to_json_pretty(&self) -> Result<String, crate::utils::AnalyzerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_fields_are_flattened() {
        let mut result = AnalysisResult::new();
        result.success = true;
        result.patient.name = "John Doe".to_string();
        result.patient.age = "45".to_string();
        result.doctor.registration_number = "MED123456".to_string();
        result.raw_text = "x".repeat(800);

        let response = AnalysisResponse::from(&result);
        assert_eq!(response.patient_name, "John Doe");
        assert_eq!(response.patient_age, 45);
        assert_eq!(response.doctor_license, "MED123456");
        assert_eq!(response.extracted_text.len(), EXTRACTED_TEXT_LIMIT);
        assert_eq!(response.message, "Analysis completed successfully");
    }

    #[test]
    fn test_failed_result_maps_error_to_message() {
        let mut result = AnalysisResult::new();
        result.error = "Image file not found".to_string();
        let response = AnalysisResponse::from(&result);
        assert_eq!(response.patient_age, 0);
        assert_eq!(response.message, "Image file not found");

        let json = response.to_json_pretty().unwrap();
        assert!(json.contains("\"patient_age\": 0"));
    }
}
