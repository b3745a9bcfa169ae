use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::models::{AnalysisResult, AnalysisStage, KnowledgeBase};
use crate::processing::*;
use crate::utils::AnalyzerError;

pub const NO_TEXT_MESSAGE: &str = "No readable text found in the image";

/// What the analyzer can do in this process
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub available_engines: Vec<AvailableEngine>,
    pub unavailable_engines: Vec<UnavailableEngine>,
    pub knowledge_base_entries: usize,
    /// Whether near-miss names can still match the knowledge base
    pub fuzzy_matching: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableEngine {
    pub name: String,
    pub kind: EngineKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnavailableEngine {
    pub name: String,
    pub reason: String,
}

/// Runs the full prescription pipeline:
/// preprocessing, OCR arbitration, field and medicine extraction, scoring.
pub struct PrescriptionAnalyzer {
    config: AnalyzerConfig,
    engines: EngineSet,
    medicines: MedicineExtractor,
}

impl PrescriptionAnalyzer {
    /// Build an analyzer whose OCR engines are probed from the config.
    pub fn new(config: AnalyzerConfig) -> Self {
        let engines = EngineSet::negotiate(&config);
        Self::with_engine_set(config, engines)
    }

    pub fn with_engines(config: AnalyzerConfig, engines: Vec<Box<dyn TextExtractionEngine>>) -> Self {
        Self::with_engine_set(config, EngineSet::from_engines(engines))
    }

    fn with_engine_set(config: AnalyzerConfig, engines: EngineSet) -> Self {
        if engines.is_empty() {
            warn!("No OCR engine available, image analysis will find no text");
        }
        let medicines = MedicineExtractor::new(&config);
        PrescriptionAnalyzer { config, engines, medicines }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            available_engines: self
                .engines
                .engines()
                .iter()
                .map(|engine| AvailableEngine { name: engine.name().to_string(), kind: engine.kind() })
                .collect(),
            unavailable_engines: self
                .engines
                .unavailable_engines()
                .iter()
                .map(|(name, reason)| UnavailableEngine { name: name.clone(), reason: reason.clone() })
                .collect(),
            knowledge_base_entries: KnowledgeBase::len(),
            fuzzy_matching: self.config.knowledge_base_similarity < 100.0,
        }
    }

    /// Analyze a prescription image. Never fails: problems are reported
    /// through `success`, `stage` and `error` on the returned record.
    pub fn analyze<P: AsRef<Path>>(&self, image_path: P) -> AnalysisResult {
        let image_path = image_path.as_ref();
        let mut result = AnalysisResult::new();
        info!("Analyzing {:?} as {}", image_path, result.prescription_id);

        self.guarded(&mut result, |analyzer, result| analyzer.run_image(image_path, result));
        result
    }

    /// Run the text stages on an already transcribed prescription.
    pub fn analyze_text(&self, text: &str, ocr_confidence: f64) -> AnalysisResult {
        let mut result = AnalysisResult::new();
        self.guarded(&mut result, |analyzer, result| {
            analyzer.run_text(text, ocr_confidence, result);
            Ok(())
        });
        result
    }

    fn guarded<F>(&self, result: &mut AnalysisResult, stages: F)
    where
        F: FnOnce(&Self, &mut AnalysisResult) -> Result<(), AnalyzerError>,
    {
        let outcome = catch_unwind(AssertUnwindSafe(|| stages(self, &mut *result)));
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("Internal error: {}", panic_reason(&panic)),
        };
        error!("Analysis {} failed during {:?}: {}", result.prescription_id, result.stage, message);
        result.fail(AnalysisStage::Error, message);
    }

    fn run_image(&self, image_path: &Path, result: &mut AnalysisResult) -> Result<(), AnalyzerError> {
        if !image_path.is_file() {
            return Err(AnalyzerError::ImageNotFound(image_path.display().to_string()));
        }

        enter(result, AnalysisStage::Preprocessing);
        let variants = ImageProcessor::preprocess(image_path);
        if variants.is_empty() {
            return Err(AnalyzerError::ImageProcessing(format!(
                "Failed to decode image {}",
                image_path.display()
            )));
        }

        enter(result, AnalysisStage::Ocr);
        let (text, ocr_confidence) =
            OcrArbiter::select(&variants, self.engines.engines(), self.config.max_variants);
        drop(variants);

        self.run_text(&text, ocr_confidence, result);
        Ok(())
    }

    fn run_text(&self, text: &str, ocr_confidence: f64, result: &mut AnalysisResult) {
        if text.trim().is_empty() {
            warn!("Analysis {}: {}", result.prescription_id, NO_TEXT_MESSAGE);
            result.fail(AnalysisStage::NoText, NO_TEXT_MESSAGE);
            return;
        }
        result.raw_text = text.to_string();

        enter(result, AnalysisStage::FieldExtraction);
        result.patient = FieldExtractor::extract_patient_info(text);
        result.doctor = FieldExtractor::extract_doctor_info(text);
        result.diagnosis = FieldExtractor::extract_diagnosis(text, self.config.max_diagnoses);

        enter(result, AnalysisStage::MedicineExtraction);
        result.medicines = self.medicines.extract(text);

        enter(result, AnalysisStage::Scoring);
        result.confidence_score =
            ConfidenceScorer::score(ocr_confidence, &result.patient, &result.doctor, &result.medicines);

        enter(result, AnalysisStage::Done);
        result.success = true;
        info!(
            "Analysis {} complete: {} medicines, confidence {:.2}",
            result.prescription_id,
            result.medicines.len(),
            result.confidence_score
        );
    }
}

fn enter(result: &mut AnalysisResult, stage: AnalysisStage) {
    debug!("{}: {:?} -> {:?}", result.prescription_id, result.stage, stage);
    result.stage = stage;
}

fn panic_reason(panic: &Box<dyn Any + Send + 'static>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_only() -> PrescriptionAnalyzer {
        PrescriptionAnalyzer::with_engines(AnalyzerConfig::default(), Vec::new())
    }

    #[test]
    fn test_blank_text_is_no_text_failure() {
        let result = text_only().analyze_text("  \n\t ", 0.9);
        assert!(!result.success);
        assert_eq!(result.stage, AnalysisStage::NoText);
        assert_eq!(result.error, NO_TEXT_MESSAGE);
        assert!(result.medicines.is_empty());
    }

    #[test]
    fn test_text_stages_reach_done() {
        let result = text_only().analyze_text("Dr. Smith\nTab Dolo 650mg twice daily", 0.8);
        assert!(result.success);
        assert_eq!(result.stage, AnalysisStage::Done);
        assert_eq!(result.doctor.name, "Smith");
        assert!(result.error.is_empty());
        assert!(result.confidence_score >= 0.4);
    }

    #[test]
    fn test_missing_image_is_error() {
        let result = text_only().analyze("/definitely/not/here.jpg");
        assert!(!result.success);
        assert_eq!(result.stage, AnalysisStage::Error);
        assert!(result.error.contains("not found"));
    }

    #[test]
    fn test_panics_are_converted() {
        let analyzer = text_only();
        let mut result = AnalysisResult::new();
        analyzer.guarded(&mut result, |_, _| panic!("stage exploded"));
        assert!(!result.success);
        assert_eq!(result.stage, AnalysisStage::Error);
        assert!(result.error.contains("stage exploded"));
    }

    #[test]
    fn test_capabilities_report() {
        let caps = text_only().capabilities();
        assert!(caps.available_engines.is_empty());
        assert!(caps.knowledge_base_entries > 50);
        assert!(caps.fuzzy_matching);

        let exact_only = AnalyzerConfig { knowledge_base_similarity: 100.0, ..AnalyzerConfig::default() };
        let caps = PrescriptionAnalyzer::with_engines(exact_only, Vec::new()).capabilities();
        assert!(!caps.fuzzy_matching);
    }

    struct RegionStub;

    impl TextExtractionEngine for RegionStub {
        fn name(&self) -> &str {
            "regions"
        }

        fn kind(&self) -> EngineKind {
            EngineKind::RegionBased
        }

        fn recognize(&self, _image: &image::GrayImage) -> Result<Option<OcrCandidate>, AnalyzerError> {
            Ok(None)
        }
    }

    #[test]
    fn test_capabilities_report_engine_kinds() {
        let analyzer = PrescriptionAnalyzer::with_engines(AnalyzerConfig::default(), vec![Box::new(RegionStub)]);
        let caps = analyzer.capabilities();
        assert_eq!(caps.available_engines.len(), 1);
        assert_eq!(caps.available_engines[0].name, "regions");
        assert_eq!(caps.available_engines[0].kind, EngineKind::RegionBased);

        let json = serde_json::to_string(&caps).unwrap();
        assert!(json.contains("\"kind\":\"region_based\""));
    }
}
