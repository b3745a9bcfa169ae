use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::AnalyzerError;

/// Process-wide analyzer settings, built once and shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Directory holding Tesseract `*.traineddata` files
    pub tessdata_dir: Option<String>,
    pub language: String,
    /// Word regions scoring at or below this are dropped by the region engine
    pub region_confidence_threshold: f64,
    pub max_variants: usize,
    /// Tesseract page segmentation modes tried in order by the whole-image engine
    pub page_seg_modes: Vec<u8>,
    pub min_text_chars: usize,
    pub max_medicines: usize,
    pub max_diagnoses: usize,
    pub dedup_similarity: f64,
    pub knowledge_base_similarity: f64,
    pub instructions_max_chars: usize,
    pub enable_region_engine: bool,
    pub enable_whole_image_engine: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            tessdata_dir: None,
            language: "eng".to_string(),
            region_confidence_threshold: 0.3,
            max_variants: 3,
            page_seg_modes: vec![6, 3, 11],
            min_text_chars: 10,
            max_medicines: 8,
            max_diagnoses: 5,
            dedup_similarity: 85.0,
            knowledge_base_similarity: 80.0,
            instructions_max_chars: 100,
            enable_region_engine: true,
            enable_whole_image_engine: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalyzerError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalyzerError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        let config: AnalyzerConfig = serde_json::from_str(&raw)
            .map_err(|e| AnalyzerError::Config(format!("Invalid config {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `TESSDATA_PREFIX` and `RXSCAN_OCR_LANG` when they are set.
    pub fn with_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("TESSDATA_PREFIX") {
            if !dir.trim().is_empty() {
                self.tessdata_dir = Some(dir);
            }
        }
        if let Ok(lang) = std::env::var("RXSCAN_OCR_LANG") {
            if !lang.trim().is_empty() {
                self.language = lang.trim().to_string();
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.language.trim().is_empty() {
            return Err(AnalyzerError::Config("OCR language must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.region_confidence_threshold) {
            return Err(AnalyzerError::Config(format!(
                "region_confidence_threshold must be within [0, 1], got {}",
                self.region_confidence_threshold
            )));
        }
        if !(1..=3).contains(&self.max_variants) {
            return Err(AnalyzerError::Config(format!(
                "max_variants must be between 1 and 3, got {}",
                self.max_variants
            )));
        }
        for (name, value) in [
            ("dedup_similarity", self.dedup_similarity),
            ("knowledge_base_similarity", self.knowledge_base_similarity),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AnalyzerError::Config(format!(
                    "{} must be within [0, 100], got {}",
                    name, value
                )));
            }
        }
        if let Some(psm) = self.page_seg_modes.iter().find(|psm| **psm > 13) {
            return Err(AnalyzerError::Config(format!("Unknown page segmentation mode {}", psm)));
        }
        if self.max_medicines == 0 {
            return Err(AnalyzerError::Config("max_medicines must be at least 1".to_string()));
        }
        Ok(())
    }
}
