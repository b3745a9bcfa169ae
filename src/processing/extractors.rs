// Patient, doctor and diagnosis extraction from OCR text
use crate::models::{DoctorInfo, PatientInfo};
use crate::processing::patterns::{
    COMMON_CONDITIONS, DIAGNOSIS_PATTERNS, DOCTOR_NAME_PATTERNS, PATIENT_AGE_PATTERNS,
    PATIENT_GENDER_PATTERNS, PATIENT_NAME_LINE_PATTERN, PATIENT_NAME_PATTERNS,
    REGISTRATION_PATTERNS, SPECIALIZATION_PATTERNS,
};
use crate::utils::text::{cut_at_field_label, normalize_whitespace, title_case};

pub struct FieldExtractor;

impl FieldExtractor {
    pub fn extract_patient_info(text: &str) -> PatientInfo {
        let cleaned = normalize_whitespace(text);
        PatientInfo {
            name: Self::extract_patient_name(text, &cleaned).unwrap_or_default(),
            age: Self::extract_patient_age(&cleaned).unwrap_or_default(),
            gender: Self::extract_patient_gender(&cleaned).unwrap_or_default(),
        }
    }

    pub fn extract_doctor_info(text: &str) -> DoctorInfo {
        let cleaned = normalize_whitespace(text);
        DoctorInfo {
            name: Self::extract_doctor_name(&cleaned).unwrap_or_default(),
            specialization: Self::extract_specialization(&cleaned).unwrap_or_default(),
            registration_number: Self::extract_registration_number(&cleaned).unwrap_or_default(),
        }
    }

    /// Labeled and honorific patterns run on normalized text; the
    /// standalone-name fallback needs the original line breaks.
    fn extract_patient_name(raw: &str, cleaned: &str) -> Option<String> {
        for pattern in PATIENT_NAME_PATTERNS.iter() {
            for captures in pattern.captures_iter(cleaned) {
                if let Some(name) = captures.get(1).and_then(|m| Self::accept_patient_name(m.as_str())) {
                    return Some(name);
                }
            }
        }
        raw.lines()
            .filter_map(|line| PATIENT_NAME_LINE_PATTERN.captures(line))
            .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
            .filter(|candidate| cut_at_field_label(candidate) == candidate.trim())
            .find_map(|candidate| Self::accept_patient_name(&candidate))
    }

    fn accept_patient_name(captured: &str) -> Option<String> {
        let value = cut_at_field_label(captured);
        let value = value.trim();
        let length = value.chars().count();
        if (3..=40).contains(&length)
            && !value.chars().any(|c| c.is_ascii_digit())
            && value.split_whitespace().count() <= 4
        {
            Some(title_case(value))
        } else {
            None
        }
    }

    fn extract_patient_age(cleaned: &str) -> Option<String> {
        for pattern in PATIENT_AGE_PATTERNS.iter() {
            for captures in pattern.captures_iter(cleaned) {
                let Some(matched) = captures.get(1) else { continue };
                if let Ok(age) = matched.as_str().parse::<u32>() {
                    if (1..=120).contains(&age) {
                        return Some(age.to_string());
                    }
                }
            }
        }
        None
    }

    fn extract_patient_gender(cleaned: &str) -> Option<String> {
        for pattern in PATIENT_GENDER_PATTERNS.iter() {
            if let Some(matched) = pattern.captures(cleaned).and_then(|c| c.get(1)) {
                return match matched.as_str().to_lowercase().as_str() {
                    "m" | "male" => Some("Male".to_string()),
                    "f" | "female" => Some("Female".to_string()),
                    _ => None,
                };
            }
        }
        None
    }

    fn extract_doctor_name(cleaned: &str) -> Option<String> {
        for pattern in DOCTOR_NAME_PATTERNS.iter() {
            for captures in pattern.captures_iter(cleaned) {
                let Some(matched) = captures.get(1) else { continue };
                let value = cut_at_field_label(matched.as_str());
                let value = value.trim_matches(|c: char| c == '.' || c.is_whitespace());
                if (3..=50).contains(&value.chars().count()) {
                    return Some(title_case(value));
                }
            }
        }
        None
    }

    fn extract_specialization(cleaned: &str) -> Option<String> {
        SPECIALIZATION_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(cleaned))
            .map(|(_, label)| label.to_string())
    }

    fn extract_registration_number(cleaned: &str) -> Option<String> {
        for pattern in REGISTRATION_PATTERNS.iter() {
            for captures in pattern.captures_iter(cleaned) {
                let Some(matched) = captures.get(1) else { continue };
                let value = matched.as_str().to_uppercase();
                // A registration number always carries digits
                if value.chars().any(|c| c.is_ascii_digit()) {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Conditions named after diagnosis phrasing come first, then known
    /// condition keywords; duplicates are dropped case-insensitively.
    pub fn extract_diagnosis(text: &str, limit: usize) -> Vec<String> {
        let cleaned = normalize_whitespace(text);
        let mut diagnosis: Vec<String> = Vec::new();
        let mut push_unique = |condition: String| {
            if !diagnosis.iter().any(|d| d.eq_ignore_ascii_case(&condition)) {
                diagnosis.push(condition);
            }
        };

        for pattern in DIAGNOSIS_PATTERNS.iter() {
            for captures in pattern.captures_iter(&cleaned) {
                let Some(matched) = captures.get(1) else { continue };
                let condition = cut_at_field_label(matched.as_str());
                if condition.chars().count() > 3 {
                    push_unique(title_case(condition.trim()));
                }
            }
        }

        let lower = cleaned.to_lowercase();
        for condition in COMMON_CONDITIONS {
            if lower.contains(condition) {
                push_unique(title_case(condition));
            }
        }

        diagnosis.truncate(limit);
        diagnosis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Patient Name: John Doe\nAge: 45 years\nGender: Male\n\nDr. Smith\nMBBS, MD\nRegistration No: MED123456\n\nMedications:\n1. Paracetamol 500mg - twice daily for 5 days\n\nDiagnosis: Fever and throat infection\n";

    #[test]
    fn test_patient_info_from_labeled_text() {
        let patient = FieldExtractor::extract_patient_info(SAMPLE);
        assert_eq!(patient.name, "John Doe");
        assert_eq!(patient.age, "45");
        assert_eq!(patient.gender, "Male");
    }

    #[test]
    fn test_patient_name_cut_at_next_label() {
        let patient = FieldExtractor::extract_patient_info("Patient: john doe Age: 45 Sex: F");
        assert_eq!(patient.name, "John Doe");
        assert_eq!(patient.gender, "Female");
    }

    #[test]
    fn test_honorific_and_line_fallbacks() {
        let patient = FieldExtractor::extract_patient_info("Mrs. Priya Sharma 32/F");
        assert_eq!(patient.name, "Priya Sharma");
        assert_eq!(patient.gender, "Female");

        // "Clinic Hours" is a header line, not a name
        let patient = FieldExtractor::extract_patient_info("Clinic Hours\n\nAnita Rao\n");
        assert_eq!(patient.name, "Anita Rao");
    }

    #[test]
    fn test_lone_gender_letter() {
        let patient = FieldExtractor::extract_patient_info("Patient: John Doe\nM");
        assert_eq!(patient.name, "John Doe");
        assert_eq!(patient.gender, "Male");

        let patient = FieldExtractor::extract_patient_info("Name: Asha Verma F");
        assert_eq!(patient.name, "Asha Verma");
        assert_eq!(patient.gender, "Female");
    }

    #[test]
    fn test_age_out_of_range_is_rejected() {
        let patient = FieldExtractor::extract_patient_info("Age: 150");
        assert_eq!(patient.age, "");
        let patient = FieldExtractor::extract_patient_info("Age: 0 but 7 years old");
        assert_eq!(patient.age, "7");
    }

    #[test]
    fn test_name_with_digits_is_rejected() {
        let patient = FieldExtractor::extract_patient_info("Name: R2D2 unit");
        assert_eq!(patient.name, "");
    }

    #[test]
    fn test_doctor_info() {
        let doctor = FieldExtractor::extract_doctor_info(SAMPLE);
        assert_eq!(doctor.name, "Smith");
        assert_eq!(doctor.registration_number, "MED123456");
        assert_eq!(doctor.specialization, "MBBS");
    }

    #[test]
    fn test_doctor_via_consultant_label() {
        let doctor = FieldExtractor::extract_doctor_info("Consultant: Anil Kumar Cardiologist");
        assert_eq!(doctor.name, "Anil Kumar Cardiologist");
        assert_eq!(doctor.specialization, "Cardiologist");
    }

    #[test]
    fn test_doctor_name_label() {
        let doctor = FieldExtractor::extract_doctor_info("Doctor Name: Anil Kumar");
        assert_eq!(doctor.name, "Anil Kumar");
        let doctor = FieldExtractor::extract_doctor_info("Dr. Namdev Patil");
        assert_eq!(doctor.name, "Namdev Patil");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let doctor = FieldExtractor::extract_doctor_info("nothing useful here");
        assert_eq!(doctor, DoctorInfo::default());
        let patient = FieldExtractor::extract_patient_info("");
        assert_eq!(patient, PatientInfo::default());
    }

    #[test]
    fn test_diagnosis_order_and_dedup() {
        let diagnosis = FieldExtractor::extract_diagnosis(SAMPLE, 5);
        assert_eq!(diagnosis[0], "Fever And Throat Infection");
        assert!(diagnosis.contains(&"Fever".to_string()));
        assert!(diagnosis.contains(&"Infection".to_string()));

        let diagnosis = FieldExtractor::extract_diagnosis("Diagnosis: fever", 5);
        assert_eq!(diagnosis, vec!["Fever".to_string()]);
    }

    #[test]
    fn test_diagnosis_is_capped() {
        let text = "fever cough cold headache asthma migraine";
        assert_eq!(FieldExtractor::extract_diagnosis(text, 3).len(), 3);
    }
}
