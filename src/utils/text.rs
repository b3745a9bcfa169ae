// Text helpers shared by the field and medicine extractors

use strsim::normalized_levenshtein;

/// Words that start a new field on a prescription. A captured value is cut
/// at the first of these so that "John Doe Age" becomes "John Doe".
const FIELD_LABELS: &[&str] = &[
    "patient", "name", "age", "sex", "gender", "male", "female", "dob", "date", "dr", "doctor",
    "signature", "consultant", "registration", "reg", "license", "lic", "no", "diagnosis",
    "address", "phone", "mobile", "weight", "years", "yrs", "tab", "tablet", "tablets", "cap",
    "capsule", "capsules", "syp", "syrup", "inj", "injection", "rx", "medications", "medicines",
    "mbbs", "md", "hospital", "clinic", "m", "f",
];

/// Collapse every run of whitespace (newlines included) into one space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case a string: a letter following a non-letter is upper-cased,
/// every other letter is lower-cased.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub fn is_field_label(word: &str) -> bool {
    let cleaned = strip_punctuation(word).to_lowercase();
    FIELD_LABELS.contains(&cleaned.as_str())
}

/// Keep the words of `value` up to (not including) the first field label.
pub fn cut_at_field_label(value: &str) -> String {
    value
        .split_whitespace()
        .take_while(|word| !is_field_label(word))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn strip_punctuation(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric()).to_string()
}

/// Fuzzy similarity on a 0-100 scale, tolerant of one or two OCR slips.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) * 100.0
}

/// Best-scoring candidate for `query`, if it reaches `threshold`.
pub fn best_match<'a, I>(query: &str, candidates: I, threshold: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = similarity(query, candidate);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.filter(|(_, score)| *score >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Patient:\n John\t\tDoe  "), "Patient: John Doe");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("jOHN doe"), "John Doe");
        assert_eq!(title_case("vitamin b12"), "Vitamin B12");
        assert_eq!(title_case("o'neil"), "O'Neil");
    }

    #[test]
    fn test_cut_at_field_label() {
        assert_eq!(cut_at_field_label("John Doe Age"), "John Doe");
        assert_eq!(cut_at_field_label("Smith Tab Paracetamol"), "Smith");
        assert_eq!(cut_at_field_label("Smith Registration No"), "Smith");
        assert_eq!(cut_at_field_label("Age 45"), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("paracetamol", 4), "para");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_similarity() {
        assert!(similarity("Paracetamol", "Paracetmol") > 85.0);
        assert!((similarity("Dolo", "dolo") - 100.0).abs() < f64::EPSILON);
        assert!(similarity("Xyzmedicine", "insulin") < 80.0);
    }

    #[test]
    fn test_best_match() {
        let keys = ["amoxicillin", "azithromycin", "aspirin"];
        let (key, score) = best_match("amoxicilin", keys.iter().copied(), 80.0).unwrap();
        assert_eq!(key, "amoxicillin");
        assert!(score >= 80.0);
        assert!(best_match("zzz", keys.iter().copied(), 80.0).is_none());
    }
}
