// Pattern library for prescription text.
// All tables are compiled once and only ever read afterwards.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Patient name, tried in order against whitespace-normalized text
    pub static ref PATIENT_NAME_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:patient(?:'s)?\s+name|patient|name|pt)\b\.?\s*[:\-]?\s*([a-z][a-z ']{1,60})").unwrap(),
        Regex::new(r"(?i)\b(?:mr|mrs|ms|miss|master|smt|shri)\b\.?\s+([a-z][a-z ']{1,60})").unwrap(),
    ];

    // Standalone capitalized line ("John Doe"), tried against raw lines
    pub static ref PATIENT_NAME_LINE_PATTERN: Regex =
        Regex::new(r"^\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,3})\s*$").unwrap();

    pub static ref PATIENT_AGE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bage\s*[:\-]?\s*(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\b(\d{1,3})\s*(?:years?|yrs?|y/o|yo)\b").unwrap(),
    ];

    pub static ref PATIENT_GENDER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:sex|gender)\s*[:\-]?\s*(male|female|m|f)\b").unwrap(),
        Regex::new(r"(?i)\b(male|female)\b").unwrap(),
        // "45/M", "45 yrs F"
        Regex::new(r"(?i)\b\d{1,3}\s*(?:years?|yrs?|y)?\s*[/,\-]?\s*(m|f)\b").unwrap(),
        // Lone "M" / "F" token, last resort
        Regex::new(r"(?i)\b(m|f)\b").unwrap(),
    ];

    pub static ref DOCTOR_NAME_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:doctor|dr)\b\.?\s*(?:name\b\s*)?[:\-]?\s*([a-z][a-z .']{1,60})").unwrap(),
        Regex::new(r"(?i)\bsignature\s*[:\-]?\s*(?:(?:doctor|dr)\b\.?\s*)?([a-z][a-z .']{1,60})").unwrap(),
        Regex::new(r"(?i)\bconsultant\s*[:\-]?\s*(?:(?:doctor|dr)\b\.?\s*)?([a-z][a-z .']{1,60})").unwrap(),
    ];

    pub static ref REGISTRATION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\breg(?:istration)?\.?\s*(?:no\.?|number|#)\s*[:\-]?\s*([a-z0-9]{4,20})\b").unwrap(),
        Regex::new(r"(?i)\b(?:license|licence|lic)\.?\s*(?:no\.?|number|#)?\s*[:\-]?\s*([a-z0-9]{4,20})\b").unwrap(),
        Regex::new(r"\b([A-Z]{2,4}\d{4,10})\b").unwrap(),
    ];

    // (pattern, display form); the first hit wins
    pub static ref SPECIALIZATION_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bgeneral\s+physician\b").unwrap(), "General Physician"),
        (Regex::new(r"(?i)\bcardiologist\b").unwrap(), "Cardiologist"),
        (Regex::new(r"(?i)\bp(?:a)?ediatrician\b").unwrap(), "Pediatrician"),
        (Regex::new(r"(?i)\bdermatologist\b").unwrap(), "Dermatologist"),
        (Regex::new(r"(?i)\borthop(?:a)?edic(?:ian)?\b").unwrap(), "Orthopedic"),
        (Regex::new(r"(?i)\bgyn(?:a)?ecologist\b").unwrap(), "Gynecologist"),
        (Regex::new(r"(?i)\bneurologist\b").unwrap(), "Neurologist"),
        (Regex::new(r"(?i)\bpsychiatrist\b").unwrap(), "Psychiatrist"),
        (Regex::new(r"(?i)\bdiabetologist\b").unwrap(), "Diabetologist"),
        (Regex::new(r"(?i)\bsurgeon\b").unwrap(), "Surgeon"),
        (Regex::new(r"(?i)\bdentist\b").unwrap(), "Dentist"),
        (Regex::new(r"\bENT\b").unwrap(), "ENT"),
        (Regex::new(r"(?i)\bphysician\b").unwrap(), "Physician"),
        (Regex::new(r"\bM\.?B\.?B\.?S\.?(?:\W|$)").unwrap(), "MBBS"),
        (Regex::new(r"\bB\.?D\.?S\.?(?:\W|$)").unwrap(), "BDS"),
        (Regex::new(r"\bM\.?D\.?(?:\W|$)").unwrap(), "MD"),
    ];

    pub static ref DIAGNOSIS_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:diagnosis|diagnosed\s+with|suffering\s+from|treatment\s+of)\s*[:\-]?\s*([a-z][a-z ']{2,50})").unwrap(),
    ];

    // Medicine shapes for line-by-line pattern matching
    pub static ref MEDICINE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:tab|tablet)s?\b\.?\s*([a-z]+(?:-[a-z]+)*)").unwrap(),
        Regex::new(r"(?i)\b(?:cap|capsule)s?\b\.?\s*([a-z]+(?:-[a-z]+)*)").unwrap(),
        Regex::new(r"(?i)\b(?:syp|syrup)s?\b\.?\s*([a-z]+(?:-[a-z]+)*)").unwrap(),
        Regex::new(r"(?i)\b(?:inj|injection)\b\.?\s*([a-z]+(?:-[a-z]+)*)").unwrap(),
        Regex::new(r"^\s*\d{1,2}\s*[.)]\s*([A-Za-z]+(?:-[A-Za-z]+)*)").unwrap(),
        Regex::new(r"^\s*[-*•]\s*([A-Za-z]+(?:-[A-Za-z]+)*)").unwrap(),
    ];

    // Each match counts as one signal that a line names a medicine
    pub static ref MEDICINE_INDICATORS: Vec<Regex> = vec![
        Regex::new(r"(?i)\d+(?:\.\d+)?\s*(?:mg|ml|gm|mcg|g|iu)\b").unwrap(),
        Regex::new(r"(?i)\b(?:tab|tablet|cap|capsule|syp|syrup|inj)s?\b").unwrap(),
        Regex::new(r"(?i)\b(?:daily|once|twice|thrice|times|every|morning|night|bedtime|weekly)\b").unwrap(),
        Regex::new(r"(?i)\b(?:bid|tid|qid|od|bd|tds|hs|sos)\b").unwrap(),
    ];

    pub static ref DOSAGE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mg|ml|gm|mcg|g)\b").unwrap(),
        Regex::new(r"(?i)\b(\d+)\s*x\s*(\d+)\b").unwrap(),
        Regex::new(r"\b(\d+)\s*/\s*(\d+)\b").unwrap(),
    ];

    // (pattern, label); a label containing {n} takes capture group 1
    pub static ref FREQUENCY_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bonce\s*(?:a\s*)?(?:day|daily)\b|\bod\b").unwrap(), "Once daily"),
        (Regex::new(r"(?i)\btwice\s*(?:a\s*)?(?:day|daily)\b|\bbid\b|\bbd\b").unwrap(), "Twice daily"),
        (Regex::new(r"(?i)\b(?:thrice|three\s+times)\s*(?:a\s*)?(?:day|daily)\b|\btid\b|\btds\b").unwrap(), "Three times daily"),
        (Regex::new(r"(?i)\bfour\s+times\s*(?:a\s*)?(?:day|daily)\b|\bqid\b").unwrap(), "Four times daily"),
        (Regex::new(r"(?i)\bevery\s*(\d+)\s*(?:hours?|hrs?)\b").unwrap(), "Every {n} hours"),
        (Regex::new(r"(?i)\b(\d+)\s*times?\s*(?:a\s*)?(?:day|daily)\b").unwrap(), "{n} times daily"),
    ];

    // (pattern, unit); "course" has no number
    pub static ref DURATION_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\b(\d+)\s*days?\b").unwrap(), "day"),
        (Regex::new(r"(?i)\b(\d+)\s*weeks?\b").unwrap(), "week"),
        (Regex::new(r"(?i)\b(\d+)\s*months?\b").unwrap(), "month"),
    ];

    pub static ref COURSE_PATTERN: Regex = Regex::new(r"(?i)\bcourse\b").unwrap();
}

/// Lines mentioning these are headers or signatures, not medicines
pub const NON_MEDICINE_KEYWORDS: &[&str] = &["patient", "doctor", "dr.", "hospital", "clinic"];

/// Words that describe a dose rather than name a drug
pub const MEDICINE_STOPWORDS: &[&str] = &[
    "tab", "tabs", "tablet", "tablets", "cap", "caps", "capsule", "capsules", "syp", "syrup",
    "inj", "injection", "daily", "once", "twice", "thrice", "times", "every", "morning", "night",
    "bedtime", "weekly", "bid", "tid", "qid", "od", "bd", "tds", "hs", "sos", "mg", "ml", "gm",
    "mcg", "for", "after", "before", "with", "and", "take", "days", "day", "weeks", "week",
];

pub const COMMON_CONDITIONS: &[&str] = &[
    "hypertension", "diabetes", "fever", "cold", "cough", "headache", "back pain", "arthritis",
    "infection", "allergies", "asthma", "depression", "anxiety", "migraine", "gastritis",
];

/// Domain vocabulary used when judging whether OCR output looks like a prescription
pub const DOMAIN_KEYWORDS: &[&str] = &["patient", "doctor", "dr", "tablet", "mg", "daily", "medicine"];
