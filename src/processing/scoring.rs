use crate::models::{DoctorInfo, MedicineEntry, PatientInfo};

const OCR_WEIGHT: f64 = 0.3;
const PATIENT_WEIGHT: f64 = 0.2;
const DOCTOR_WEIGHT: f64 = 0.15;
const MEDICINE_WEIGHT: f64 = 0.35;
const NO_MEDICINE_SCORE: f64 = 0.1;
const FOUND_SOMETHING_FLOOR: f64 = 0.4;

pub struct ConfidenceScorer;

impl ConfidenceScorer {
    /// Aggregate quality estimate in [0, 1].
    ///
    /// Each component is multiplied by its weight and the four products are
    /// then averaged, so the computed value alone never exceeds 0.25. Any
    /// extraction hit (patient name, doctor name or a medicine) lifts the
    /// score to at least 0.4.
    pub fn score(
        ocr_confidence: f64,
        patient: &PatientInfo,
        doctor: &DoctorInfo,
        medicines: &[MedicineEntry],
    ) -> f64 {
        let contributions = [
            ocr_confidence.clamp(0.0, 1.0) * OCR_WEIGHT,
            Self::patient_completeness(patient) * PATIENT_WEIGHT,
            Self::doctor_completeness(doctor) * DOCTOR_WEIGHT,
            Self::medicine_score(medicines) * MEDICINE_WEIGHT,
        ];
        let mut score = contributions.iter().sum::<f64>() / contributions.len() as f64;

        if !patient.name.is_empty() || !doctor.name.is_empty() || !medicines.is_empty() {
            score = score.max(FOUND_SOMETHING_FLOOR);
        }
        score.min(1.0)
    }

    pub fn patient_completeness(patient: &PatientInfo) -> f64 {
        let mut score = 0.0;
        if !patient.name.is_empty() {
            score += 0.4;
        }
        if !patient.age.is_empty() {
            score += 0.3;
        }
        if !patient.gender.is_empty() {
            score += 0.3;
        }
        score
    }

    pub fn doctor_completeness(doctor: &DoctorInfo) -> f64 {
        let mut score = 0.0;
        if !doctor.name.is_empty() {
            score += 0.6;
        }
        if !doctor.specialization.is_empty() {
            score += 0.4;
        }
        score
    }

    pub fn medicine_score(medicines: &[MedicineEntry]) -> f64 {
        if medicines.is_empty() {
            return NO_MEDICINE_SCORE;
        }
        let mean = medicines.iter().map(|m| m.confidence).sum::<f64>() / medicines.len() as f64;
        let coverage = (medicines.len() as f64 / 3.0).min(1.0);
        mean * 0.8 + coverage * 0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;

    #[test]
    fn test_empty_extraction_scores_low() {
        let score = ConfidenceScorer::score(0.0, &PatientInfo::default(), &DoctorInfo::default(), &[]);
        // only the flat medicine fallback contributes: 0.1 * 0.35 / 4
        assert!((score - 0.00875).abs() < 1e-9);
    }

    #[test]
    fn test_weights_are_averaged_not_summed() {
        let patient = PatientInfo { name: String::new(), age: "40".into(), gender: "Male".into() };
        let doctor = DoctorInfo { specialization: "MBBS".into(), ..Default::default() };
        let score = ConfidenceScorer::score(1.0, &patient, &doctor, &[]);
        let expected = (0.3 + 0.6 * 0.2 + 0.4 * 0.15 + 0.1 * 0.35) / 4.0;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_floor_applies_when_anything_found() {
        let patient = PatientInfo { name: "John Doe".into(), ..Default::default() };
        let score = ConfidenceScorer::score(0.1, &patient, &DoctorInfo::default(), &[]);
        assert!((score - 0.4).abs() < 1e-9);

        let medicine = MedicineEntry::new("Dolo", 1.0, ExtractionMethod::DatabaseMatch);
        let score = ConfidenceScorer::score(0.0, &PatientInfo::default(), &DoctorInfo::default(), &[medicine]);
        assert!(score >= 0.4);
    }

    #[test]
    fn test_medicine_score_mixes_mean_and_coverage() {
        let meds: Vec<MedicineEntry> = [1.0, 0.5]
            .iter()
            .map(|c| MedicineEntry::new("X", *c, ExtractionMethod::Pattern))
            .collect();
        let expected = 0.75 * 0.8 + (2.0 / 3.0) * 0.2;
        assert!((ConfidenceScorer::medicine_score(&meds) - expected).abs() < 1e-9);
    }
}
