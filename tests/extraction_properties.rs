use proptest::prelude::*;
use rxscan::processing::{FieldExtractor, MedicineExtractor};
use rxscan::utils::text::similarity;

fn prescription_like() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        "(Patient|Name|Pt)[:.]? [A-Za-z0-9 ]{0,24}",
        "Age:? [0-9]{1,4}( yrs)?",
        "(Sex|Gender): (M|F|Male|Female|X)",
        "Dr\\.? [A-Za-z ]{0,20}",
        "(Tab|Cap|Syp)\\.? [A-Za-z]{1,12} [0-9]{1,4}(mg|ml)? (once|twice) daily",
        "[0-9]\\. [A-Za-z]{2,10} [0-9]{1,3}mg",
        "(Dolo|Crocin|Paracetamol|Paracetmol|Amoxicillin|Amoxicilin) [0-9]{3}mg",
        "[A-Za-z0-9 ,.:/-]{0,40}",
    ];
    prop::collection::vec(line, 0..16).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn patient_age_in_range_and_name_has_no_digits(text in prescription_like()) {
        let patient = FieldExtractor::extract_patient_info(&text);
        if !patient.age.is_empty() {
            let age: u32 = patient.age.parse().unwrap();
            prop_assert!((1..=120).contains(&age));
        }
        prop_assert!(!patient.name.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn medicines_are_capped_and_ranked(text in prescription_like()) {
        let medicines = MedicineExtractor::default().extract(&text);
        prop_assert!(medicines.len() <= 8);
        for pair in medicines.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
        }
        for medicine in &medicines {
            prop_assert!(medicine.confidence > 0.0 && medicine.confidence <= 1.0);
        }
    }

    #[test]
    fn no_near_duplicate_medicines(text in prescription_like()) {
        let medicines = MedicineExtractor::default().extract(&text);
        for (i, a) in medicines.iter().enumerate() {
            for b in &medicines[i + 1..] {
                let (a, b) = (a.name.to_lowercase(), b.name.to_lowercase());
                prop_assert!(a != b && similarity(&a, &b) <= 85.0, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn diagnosis_respects_limit(text in prescription_like(), limit in 1usize..6) {
        prop_assert!(FieldExtractor::extract_diagnosis(&text, limit).len() <= limit);
    }
}
