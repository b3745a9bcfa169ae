//! Medicine extraction.
//!
//! Three independent strategies run over the same text:
//! - database substring match against the knowledge base (confidence 0.85)
//! - medicine-shaped regex per line (confidence 0.70)
//! - indicator counting per line (confidence 0.5 + 0.1 per indicator)
//!
//! Their output is concatenated in that order, de-duplicated first-seen-wins,
//! enriched from the knowledge base and ranked by confidence.

use log::debug;

use crate::config::AnalyzerConfig;
use crate::models::{
    ExtractionMethod, KnowledgeBase, MedicineEntry, DOSAGE_NOT_SPECIFIED, DURATION_NOT_SPECIFIED,
    FREQUENCY_NOT_SPECIFIED,
};
use crate::processing::patterns::{
    COURSE_PATTERN, DOSAGE_PATTERNS, DURATION_PATTERNS, FREQUENCY_PATTERNS, MEDICINE_INDICATORS,
    MEDICINE_PATTERNS, MEDICINE_STOPWORDS, NON_MEDICINE_KEYWORDS,
};
use crate::utils::text::{best_match, is_field_label, similarity, strip_punctuation, title_case, truncate_chars};

const DATABASE_MATCH_CONFIDENCE: f64 = 0.85;
const PATTERN_MATCH_CONFIDENCE: f64 = 0.7;
const LINE_ANALYSIS_BASE_CONFIDENCE: f64 = 0.5;
const LINE_ANALYSIS_INDICATOR_BONUS: f64 = 0.1;
const EXACT_ENRICHMENT_BOOST: f64 = 0.15;
const FUZZY_ENRICHMENT_BOOST: f64 = 0.10;
const MIN_LINE_ANALYSIS_CHARS: usize = 5;

pub struct MedicineExtractor {
    dedup_similarity: f64,
    knowledge_base_similarity: f64,
    instructions_max_chars: usize,
    max_medicines: usize,
}

impl Default for MedicineExtractor {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl MedicineExtractor {
    pub fn new(config: &AnalyzerConfig) -> Self {
        MedicineExtractor {
            dedup_similarity: config.dedup_similarity,
            knowledge_base_similarity: config.knowledge_base_similarity,
            instructions_max_chars: config.instructions_max_chars,
            max_medicines: config.max_medicines,
        }
    }

    pub fn extract(&self, text: &str) -> Vec<MedicineEntry> {
        let mut candidates = self.database_matches(text);
        candidates.extend(self.pattern_matches(text));
        candidates.extend(self.line_analysis_matches(text));
        debug!("Medicine candidates before merge: {}", candidates.len());

        let mut medicines = self.deduplicate(candidates);
        for medicine in medicines.iter_mut() {
            self.enrich(medicine);
        }

        medicines.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        medicines.truncate(self.max_medicines);
        medicines
    }

    /// Every knowledge-base key contained in the text, in table order.
    pub fn database_matches(&self, text: &str) -> Vec<MedicineEntry> {
        let lower = text.to_lowercase();
        KnowledgeBase::keys()
            .filter(|key| lower.contains(key))
            .map(|key| {
                let context = text
                    .lines()
                    .find(|line| line.to_lowercase().contains(key))
                    .unwrap_or(text);
                self.build_entry(&title_case(key), context, DATABASE_MATCH_CONFIDENCE, ExtractionMethod::DatabaseMatch)
            })
            .collect()
    }

    /// First medicine-shaped match on each line.
    pub fn pattern_matches(&self, text: &str) -> Vec<MedicineEntry> {
        let mut entries = Vec::new();
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let name = MEDICINE_PATTERNS.iter().find_map(|pattern| {
                pattern
                    .captures(line)
                    .and_then(|captures| captures.get(1))
                    .map(|m| strip_punctuation(m.as_str()))
                    .filter(|name| Self::plausible_name(name))
            });
            if let Some(name) = name {
                entries.push(self.build_entry(&title_case(&name), line, PATTERN_MATCH_CONFIDENCE, ExtractionMethod::Pattern));
            }
        }
        entries
    }

    /// Lines that look like a dosing instruction, named by their leading words.
    pub fn line_analysis_matches(&self, text: &str) -> Vec<MedicineEntry> {
        let mut entries = Vec::new();
        for line in text.lines().map(str::trim) {
            if line.chars().count() < MIN_LINE_ANALYSIS_CHARS {
                continue;
            }
            let lower = line.to_lowercase();
            if NON_MEDICINE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
                continue;
            }

            let indicators = MEDICINE_INDICATORS.iter().filter(|p| p.is_match(line)).count();
            if indicators == 0 {
                continue;
            }

            let name = Self::leading_name(line);
            if name.chars().count() < 3 {
                continue;
            }
            let confidence = LINE_ANALYSIS_BASE_CONFIDENCE + LINE_ANALYSIS_INDICATOR_BONUS * indicators as f64;
            entries.push(self.build_entry(&title_case(&name), line, confidence, ExtractionMethod::LineAnalysis));
        }
        entries
    }

    /// Up to two alphabetic words, skipping numbering and dose words before
    /// the name and stopping at the first token after it that is not a word.
    fn leading_name(line: &str) -> String {
        let mut words: Vec<String> = Vec::new();
        for token in line.split_whitespace() {
            let cleaned = strip_punctuation(token);
            let is_word = !cleaned.is_empty() && cleaned.chars().all(|c| c.is_alphabetic());
            let is_stopword = MEDICINE_STOPWORDS.contains(&cleaned.to_lowercase().as_str());
            if is_word && !is_stopword {
                words.push(cleaned);
                if words.len() == 2 {
                    break;
                }
            } else if !words.is_empty() {
                break;
            }
        }
        words.join(" ")
    }

    fn plausible_name(name: &str) -> bool {
        name.chars().count() >= 3
            && !name.chars().all(|c| c.is_ascii_digit())
            && !is_field_label(name)
            && !MEDICINE_STOPWORDS.contains(&name.to_lowercase().as_str())
    }

    fn build_entry(&self, name: &str, context: &str, confidence: f64, method: ExtractionMethod) -> MedicineEntry {
        let mut entry = MedicineEntry::new(name, confidence, method);
        entry.dosage = extract_dosage(context);
        entry.frequency = extract_frequency(context);
        entry.duration = extract_duration(context);
        entry.instructions = truncate_chars(context.trim(), self.instructions_max_chars);
        entry
    }

    /// First occurrence wins; later entries whose name equals or closely
    /// resembles a kept one are dropped.
    pub fn deduplicate(&self, candidates: Vec<MedicineEntry>) -> Vec<MedicineEntry> {
        let mut kept: Vec<MedicineEntry> = Vec::new();
        for candidate in candidates {
            let name = candidate.name.to_lowercase();
            let duplicate = kept.iter().any(|existing| {
                let existing_name = existing.name.to_lowercase();
                existing_name == name || similarity(&existing_name, &name) > self.dedup_similarity
            });
            if duplicate {
                debug!("Dropping duplicate medicine candidate {:?} ({})", candidate.name, candidate.extraction_method.as_str());
            } else {
                kept.push(candidate);
            }
        }
        kept
    }

    pub fn enrich(&self, medicine: &mut MedicineEntry) {
        let key = medicine.name.to_lowercase();
        if let Some(info) = KnowledgeBase::lookup(&key) {
            medicine.generic = info.generic.to_string();
            medicine.category = info.category.to_string();
            medicine.available = info.available;
            medicine.confidence = (medicine.confidence + EXACT_ENRICHMENT_BOOST).min(1.0);
            return;
        }

        if let Some((matched, score)) = best_match(&key, KnowledgeBase::keys(), self.knowledge_base_similarity) {
            if let Some(info) = KnowledgeBase::lookup(matched) {
                debug!("Fuzzy knowledge-base match {:?} -> {:?} ({:.1})", medicine.name, matched, score);
                medicine.generic = info.generic.to_string();
                medicine.category = info.category.to_string();
                medicine.available = info.available;
                medicine.confidence = (medicine.confidence + FUZZY_ENRICHMENT_BOOST).min(1.0);
                medicine.matched_key = Some(matched.to_string());
                medicine.match_score = Some(score);
            }
        }
    }
}

pub fn extract_dosage(text: &str) -> String {
    if let Some(captures) = DOSAGE_PATTERNS[0].captures(text) {
        return format!("{}{}", &captures[1], captures[2].to_lowercase());
    }
    if let Some(captures) = DOSAGE_PATTERNS[1].captures(text) {
        return format!("{}x{}", &captures[1], &captures[2]);
    }
    if let Some(captures) = DOSAGE_PATTERNS[2].captures(text) {
        return format!("{}/{}", &captures[1], &captures[2]);
    }
    DOSAGE_NOT_SPECIFIED.to_string()
}

pub fn extract_frequency(text: &str) -> String {
    for (pattern, label) in FREQUENCY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            return match captures.get(1) {
                Some(n) if label.contains("{n}") => label.replace("{n}", n.as_str()),
                _ => label.to_string(),
            };
        }
    }
    FREQUENCY_NOT_SPECIFIED.to_string()
}

pub fn extract_duration(text: &str) -> String {
    for (pattern, unit) in DURATION_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            let count = &captures[1];
            return if count == "1" {
                format!("1 {}", unit)
            } else {
                format!("{} {}s", count, unit)
            };
        }
    }
    if COURSE_PATTERN.is_match(text) {
        return "Complete course".to_string();
    }
    DURATION_NOT_SPECIFIED.to_string()
}
