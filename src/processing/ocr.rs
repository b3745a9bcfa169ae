use std::panic::{catch_unwind, AssertUnwindSafe};

use image::GrayImage;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::processing::image_processor::ImageVariant;
use crate::processing::patterns::DOMAIN_KEYWORDS;
use crate::utils::AnalyzerError;

/// Text recognized on one preprocessed variant by one engine
#[derive(Debug, Clone, PartialEq)]
pub struct OcrCandidate {
    pub text: String,
    pub confidence: f64,
    pub engine: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Scores each detected text region separately
    RegionBased,
    /// Reads the page in one pass without native confidences
    WholeImage,
}

/// A backend able to turn a grayscale image into text.
///
/// `Ok(None)` means the engine ran but found nothing worth keeping.
pub trait TextExtractionEngine: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> EngineKind;
    fn recognize(&self, image: &GrayImage) -> Result<Option<OcrCandidate>, AnalyzerError>;
}

/// Engines enabled at startup, plus the ones that could not be brought up.
pub struct EngineSet {
    engines: Vec<Box<dyn TextExtractionEngine>>,
    unavailable: Vec<(String, String)>,
}

impl EngineSet {
    pub fn from_engines(engines: Vec<Box<dyn TextExtractionEngine>>) -> Self {
        EngineSet { engines, unavailable: Vec::new() }
    }

    /// Probe each engine enabled in the config once. A failed probe is
    /// recorded with its reason and the engine is left out.
    pub fn negotiate(config: &AnalyzerConfig) -> Self {
        let mut set = EngineSet::from_engines(Vec::new());

        if config.enable_region_engine {
            set.admit(REGION_ENGINE, probe_region_engine(config));
        }
        if config.enable_whole_image_engine {
            set.admit(WHOLE_IMAGE_ENGINE, probe_whole_image_engine(config));
        }

        info!("OCR engines available: {:?}", set.available_engines());
        set
    }

    fn admit(&mut self, name: &str, probe: Result<Box<dyn TextExtractionEngine>, AnalyzerError>) {
        match probe {
            Ok(engine) => self.engines.push(engine),
            Err(e) => {
                warn!("OCR engine {} unavailable: {}", name, e);
                self.unavailable.push((name.to_string(), e.to_string()));
            }
        }
    }

    pub fn engines(&self) -> &[Box<dyn TextExtractionEngine>] {
        &self.engines
    }

    pub fn available_engines(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn unavailable_engines(&self) -> &[(String, String)] {
        &self.unavailable
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

pub const REGION_ENGINE: &str = "tesseract-regions";
pub const WHOLE_IMAGE_ENGINE: &str = "tesseract";

#[cfg(feature = "tesseract")]
fn probe_region_engine(config: &AnalyzerConfig) -> Result<Box<dyn TextExtractionEngine>, AnalyzerError> {
    let engine = tesseract_backend::RegionEngine::new(config);
    engine.probe()?;
    Ok(Box::new(engine))
}

#[cfg(feature = "tesseract")]
fn probe_whole_image_engine(config: &AnalyzerConfig) -> Result<Box<dyn TextExtractionEngine>, AnalyzerError> {
    let engine = tesseract_backend::WholeImageEngine::new(config);
    engine.probe()?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "tesseract"))]
fn probe_region_engine(_config: &AnalyzerConfig) -> Result<Box<dyn TextExtractionEngine>, AnalyzerError> {
    Err(AnalyzerError::EngineUnavailable("built without the tesseract feature".to_string()))
}

#[cfg(not(feature = "tesseract"))]
fn probe_whole_image_engine(_config: &AnalyzerConfig) -> Result<Box<dyn TextExtractionEngine>, AnalyzerError> {
    Err(AnalyzerError::EngineUnavailable("built without the tesseract feature".to_string()))
}

#[cfg(feature = "tesseract")]
mod tesseract_backend {
    use image::{GrayImage, ImageFormat};
    use log::debug;
    use tempfile::NamedTempFile;
    use tesseract::{PageSegMode, Tesseract};

    use super::{
        estimate_confidence, parse_tsv_regions, region_candidate, EngineKind, OcrCandidate,
        TextExtractionEngine, REGION_ENGINE, WHOLE_IMAGE_ENGINE,
    };
    use crate::config::AnalyzerConfig;
    use crate::utils::AnalyzerError;

    fn write_temp_png(image: &GrayImage) -> Result<NamedTempFile, AnalyzerError> {
        let temp_file = tempfile::Builder::new().prefix("rxscan-").suffix(".png").tempfile()?;
        image
            .save_with_format(temp_file.path(), ImageFormat::Png)
            .map_err(|e| AnalyzerError::Ocr(format!("Failed to write OCR input: {}", e)))?;
        Ok(temp_file)
    }

    fn load(datapath: Option<&str>, language: &str, image_path: &str) -> Result<Tesseract, AnalyzerError> {
        Tesseract::new(datapath, Some(language))
            .map_err(|e| AnalyzerError::Ocr(format!("Tesseract init error: {}", e)))?
            .set_image(image_path)
            .map_err(|e| AnalyzerError::Ocr(format!("Tesseract set image error: {}", e)))
    }

    fn probe(datapath: Option<&str>, language: &str) -> Result<(), AnalyzerError> {
        Tesseract::new(datapath, Some(language))
            .map(|_| ())
            .map_err(|e| AnalyzerError::EngineUnavailable(format!("Tesseract init error: {}", e)))
    }

    fn page_seg_mode(mode: u8) -> PageSegMode {
        match mode {
            0 => PageSegMode::PsmOsdOnly,
            1 => PageSegMode::PsmAutoOsd,
            2 => PageSegMode::PsmAutoOnly,
            4 => PageSegMode::PsmSingleColumn,
            5 => PageSegMode::PsmSingleBlockVertText,
            6 => PageSegMode::PsmSingleBlock,
            7 => PageSegMode::PsmSingleLine,
            8 => PageSegMode::PsmSingleWord,
            9 => PageSegMode::PsmCircleWord,
            10 => PageSegMode::PsmSingleChar,
            11 => PageSegMode::PsmSparseText,
            12 => PageSegMode::PsmSparseTextOsd,
            13 => PageSegMode::PsmRawLine,
            _ => PageSegMode::PsmAuto,
        }
    }

    /// Word boxes from Tesseract's TSV output, each with its own confidence
    pub struct RegionEngine {
        datapath: Option<String>,
        language: String,
        threshold: f64,
    }

    impl RegionEngine {
        pub fn new(config: &AnalyzerConfig) -> Self {
            RegionEngine {
                datapath: config.tessdata_dir.clone(),
                language: config.language.clone(),
                threshold: config.region_confidence_threshold,
            }
        }

        pub fn probe(&self) -> Result<(), AnalyzerError> {
            probe(self.datapath.as_deref(), &self.language)
        }
    }

    impl TextExtractionEngine for RegionEngine {
        fn name(&self) -> &str {
            REGION_ENGINE
        }

        fn kind(&self) -> EngineKind {
            EngineKind::RegionBased
        }

        fn recognize(&self, image: &GrayImage) -> Result<Option<OcrCandidate>, AnalyzerError> {
            let temp_file = write_temp_png(image)?;
            let image_path = temp_file
                .path()
                .to_str()
                .ok_or_else(|| AnalyzerError::Ocr("Failed to convert path to string".to_string()))?;

            let mut tess = load(self.datapath.as_deref(), &self.language, image_path)?;
            tess.set_page_seg_mode(PageSegMode::PsmAuto);
            let tsv = tess
                .get_tsv_text(0)
                .map_err(|e| AnalyzerError::Ocr(format!("Tesseract TSV error: {}", e)))?;

            let regions = parse_tsv_regions(&tsv);
            debug!("{} word regions detected", regions.len());
            Ok(region_candidate(&regions, self.threshold, REGION_ENGINE))
        }
    }

    /// Plain page OCR, tried with several page segmentation modes
    pub struct WholeImageEngine {
        datapath: Option<String>,
        language: String,
        page_seg_modes: Vec<u8>,
        min_text_chars: usize,
    }

    impl WholeImageEngine {
        pub fn new(config: &AnalyzerConfig) -> Self {
            WholeImageEngine {
                datapath: config.tessdata_dir.clone(),
                language: config.language.clone(),
                page_seg_modes: config.page_seg_modes.clone(),
                min_text_chars: config.min_text_chars,
            }
        }

        pub fn probe(&self) -> Result<(), AnalyzerError> {
            probe(self.datapath.as_deref(), &self.language)
        }
    }

    impl TextExtractionEngine for WholeImageEngine {
        fn name(&self) -> &str {
            WHOLE_IMAGE_ENGINE
        }

        fn kind(&self) -> EngineKind {
            EngineKind::WholeImage
        }

        fn recognize(&self, image: &GrayImage) -> Result<Option<OcrCandidate>, AnalyzerError> {
            let temp_file = write_temp_png(image)?;
            let image_path = temp_file
                .path()
                .to_str()
                .ok_or_else(|| AnalyzerError::Ocr("Failed to convert path to string".to_string()))?;

            for &mode in &self.page_seg_modes {
                let attempt = load(self.datapath.as_deref(), &self.language, image_path).and_then(|mut tess| {
                    tess.set_page_seg_mode(page_seg_mode(mode));
                    tess.get_text()
                        .map_err(|e| AnalyzerError::Ocr(format!("Tesseract error: {}", e)))
                });

                match attempt {
                    Ok(text) => {
                        let text = text.trim();
                        if text.chars().count() > self.min_text_chars {
                            return Ok(Some(OcrCandidate {
                                text: text.to_string(),
                                confidence: estimate_confidence(text),
                                engine: WHOLE_IMAGE_ENGINE.to_string(),
                            }));
                        }
                        debug!("PSM {} produced too little text", mode);
                    }
                    Err(e) => debug!("PSM {} failed: {}", mode, e),
                }
            }
            Ok(None)
        }
    }
}

/// Parse Tesseract TSV output into (word, confidence in [0,1]) pairs.
/// Only word-level rows with a real confidence are kept.
pub fn parse_tsv_regions(tsv: &str) -> Vec<(String, f64)> {
    tsv.lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split('\t').collect();
            if columns.len() < 12 || columns[0] != "5" {
                return None;
            }
            let confidence: f64 = columns[10].trim().parse().ok()?;
            let word = columns[11].trim();
            if confidence < 0.0 || word.is_empty() {
                return None;
            }
            Some((word.to_string(), confidence / 100.0))
        })
        .collect()
}

/// Join regions scoring above `threshold`; confidence is their mean.
pub fn region_candidate(regions: &[(String, f64)], threshold: f64, engine: &str) -> Option<OcrCandidate> {
    let kept: Vec<&(String, f64)> = regions.iter().filter(|(_, conf)| *conf > threshold).collect();
    if kept.is_empty() {
        return None;
    }
    let text = kept.iter().map(|(word, _)| word.as_str()).collect::<Vec<_>>().join(" ");
    let confidence = kept.iter().map(|(_, conf)| conf).sum::<f64>() / kept.len() as f64;
    Some(OcrCandidate { text, confidence, engine: engine.to_string() })
}

fn contains_domain_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    DOMAIN_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Confidence guess for engines that report none.
pub fn estimate_confidence(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }

    let alpha_ratio = text.chars().filter(|c| c.is_alphabetic()).count() as f64 / total as f64;
    let digit_ratio = text.chars().filter(|c| c.is_ascii_digit()).count() as f64 / total as f64;

    let mut confidence = 0.5;
    if (0.4..=0.8).contains(&alpha_ratio) {
        confidence += 0.2;
    }
    if digit_ratio <= 0.3 {
        confidence += 0.1;
    }
    if contains_domain_keyword(text) {
        confidence += 0.2;
    }
    f64::min(confidence, 1.0)
}

/// How much a text looks like a structured prescription.
pub fn text_quality(text: &str) -> f64 {
    let mut quality = 0.0;
    if contains_domain_keyword(text) {
        quality += 0.5;
    }
    if text.contains([':', '.', ',']) {
        quality += 0.25;
    }
    if text.contains('\n') {
        quality += 0.25;
    }
    f64::min(quality, 1.0)
}

pub fn candidate_score(candidate: &OcrCandidate) -> f64 {
    let length_score = (candidate.text.chars().count() as f64 / 100.0).min(1.0);
    candidate.confidence * 0.4 + length_score * 0.3 + text_quality(&candidate.text) * 0.3
}

/// Picks the best transcription across engines and variants.
pub struct OcrArbiter;

impl OcrArbiter {
    /// Run every engine on each of the first `max_variants` variants and
    /// keep the highest scoring candidate. Engine failures are skipped.
    pub fn select(
        variants: &[ImageVariant],
        engines: &[Box<dyn TextExtractionEngine>],
        max_variants: usize,
    ) -> (String, f64) {
        let mut candidates = Vec::new();

        for variant in variants.iter().take(max_variants) {
            for engine in engines {
                let outcome = catch_unwind(AssertUnwindSafe(|| engine.recognize(&variant.image)));
                match outcome {
                    Ok(Ok(Some(candidate))) if !candidate.text.trim().is_empty() => {
                        debug!(
                            "{} ({:?}) on {} variant: {} chars, confidence {:.2}",
                            engine.name(),
                            engine.kind(),
                            variant.name,
                            candidate.text.len(),
                            candidate.confidence
                        );
                        candidates.push(candidate);
                    }
                    Ok(Ok(_)) => debug!("{} found no text on {} variant", engine.name(), variant.name),
                    Ok(Err(e)) => warn!("{} failed on {} variant: {}", engine.name(), variant.name, e),
                    Err(_) => warn!("{} panicked on {} variant", engine.name(), variant.name),
                }
            }
        }

        Self::best(candidates)
    }

    /// Highest score wins; on ties the earliest candidate is kept.
    pub fn best(candidates: Vec<OcrCandidate>) -> (String, f64) {
        let mut best: Option<(f64, OcrCandidate)> = None;
        for candidate in candidates {
            let score = candidate_score(&candidate);
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, candidate));
            }
        }
        match best {
            Some((_, candidate)) => (candidate.text, candidate.confidence.clamp(0.0, 1.0)),
            None => (String::new(), 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEngine {
        outputs: Vec<Result<Option<(&'static str, f64)>, &'static str>>,
        calls: AtomicUsize,
    }

    impl FixedEngine {
        fn new(outputs: Vec<Result<Option<(&'static str, f64)>, &'static str>>) -> Self {
            FixedEngine { outputs, calls: AtomicUsize::new(0) }
        }
    }

    impl TextExtractionEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn kind(&self) -> EngineKind {
            EngineKind::WholeImage
        }

        fn recognize(&self, _image: &GrayImage) -> Result<Option<OcrCandidate>, AnalyzerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outputs[call.min(self.outputs.len() - 1)] {
                Ok(Some((text, confidence))) => Ok(Some(OcrCandidate {
                    text: text.to_string(),
                    confidence: *confidence,
                    engine: "fixed".to_string(),
                })),
                Ok(None) => Ok(None),
                Err(msg) => Err(AnalyzerError::Ocr(msg.to_string())),
            }
        }
    }

    fn variants(count: usize) -> Vec<ImageVariant> {
        (0..count)
            .map(|_| ImageVariant { name: "test", image: ImageBuffer::from_pixel(4, 4, Luma([255u8])) })
            .collect()
    }

    fn candidate(text: &str, confidence: f64) -> OcrCandidate {
        OcrCandidate { text: text.to_string(), confidence, engine: "t".to_string() }
    }

    #[test]
    fn test_estimate_confidence() {
        assert_eq!(estimate_confidence(""), 0.0);
        // alpha ratio 10/12, no digits, no keyword
        assert!((estimate_confidence("hello world!") - 0.6).abs() < 1e-9);
        // alpha ratio inside the band plus keyword
        assert!((estimate_confidence("Tablet 500 mg daily") - 1.0).abs() < 1e-9);
        assert!((estimate_confidence("1234567890") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_text_quality() {
        assert_eq!(text_quality("plain words"), 0.0);
        assert_eq!(text_quality("Patient: John\nAge 45"), 1.0);
        assert_eq!(text_quality("x, y"), 0.25);
    }

    #[test]
    fn test_parse_tsv_regions_keeps_scored_words() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t10\t10\t40\t12\t91.5\tPatient\n\
                   5\t1\t1\t1\t1\t2\t55\t10\t40\t12\t12\tJ0hn\n\
                   5\t1\t1\t1\t1\t3\t99\t10\t40\t12\t-1\t \n";
        let regions = parse_tsv_regions(tsv);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].0, "Patient");
        assert!((regions[0].1 - 0.915).abs() < 1e-9);
    }

    #[test]
    fn test_region_candidate_filters_low_confidence() {
        let regions = vec![
            ("Tab".to_string(), 0.9),
            ("noise".to_string(), 0.2),
            ("Dolo".to_string(), 0.7),
        ];
        let candidate = region_candidate(&regions, 0.3, "regions").unwrap();
        assert_eq!(candidate.text, "Tab Dolo");
        assert!((candidate.confidence - 0.8).abs() < 1e-9);

        assert!(region_candidate(&[("x".to_string(), 0.3)], 0.3, "regions").is_none());
    }

    #[test]
    fn test_best_prefers_higher_score_and_keeps_first_on_tie() {
        let (text, conf) = OcrArbiter::best(vec![candidate("short", 0.9), candidate("Patient: John Doe\nTab Dolo 650 mg daily", 0.6)]);
        assert!(text.starts_with("Patient"));
        assert!((conf - 0.6).abs() < 1e-9);

        let (text, _) = OcrArbiter::best(vec![candidate("first", 0.5), candidate("other", 0.5)]);
        assert_eq!(text, "first");

        assert_eq!(OcrArbiter::best(Vec::new()), (String::new(), 0.0));
    }

    #[test]
    fn test_select_skips_failures_and_bounds_variants() {
        let engine = FixedEngine::new(vec![
            Err("boom"),
            Ok(None),
            Ok(Some(("Dr. Smith prescribes tablet", 0.7))),
        ]);
        let engines: Vec<Box<dyn TextExtractionEngine>> = vec![Box::new(engine)];
        let (text, conf) = OcrArbiter::select(&variants(5), &engines, 3);
        assert_eq!(text, "Dr. Smith prescribes tablet");
        assert!((conf - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_select_calls_each_engine_per_variant() {
        let engine = std::sync::Arc::new(FixedEngine::new(vec![Ok(None)]));

        struct Shared(std::sync::Arc<FixedEngine>);
        impl TextExtractionEngine for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn kind(&self) -> EngineKind {
                self.0.kind()
            }
            fn recognize(&self, image: &GrayImage) -> Result<Option<OcrCandidate>, AnalyzerError> {
                self.0.recognize(image)
            }
        }

        let engines: Vec<Box<dyn TextExtractionEngine>> = vec![Box::new(Shared(engine.clone()))];
        assert_eq!(OcrArbiter::select(&variants(5), &engines, 3), (String::new(), 0.0));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_blank_candidates_are_ignored() {
        let engine = FixedEngine::new(vec![Ok(Some(("   ", 0.9)))]);
        let engines: Vec<Box<dyn TextExtractionEngine>> = vec![Box::new(engine)];
        assert_eq!(OcrArbiter::select(&variants(1), &engines, 3), (String::new(), 0.0));
    }

    #[test]
    fn test_engine_set_reports_injected_engines() {
        let set = EngineSet::from_engines(vec![Box::new(FixedEngine::new(vec![Ok(None)]))]);
        assert_eq!(set.available_engines(), vec!["fixed".to_string()]);
        assert!(set.unavailable_engines().is_empty());
        assert!(!set.is_empty());
    }

    #[test]
    fn test_negotiate_with_everything_disabled() {
        let config = AnalyzerConfig {
            enable_region_engine: false,
            enable_whole_image_engine: false,
            ..AnalyzerConfig::default()
        };
        let set = EngineSet::negotiate(&config);
        assert!(set.is_empty());
        assert!(set.unavailable_engines().is_empty());
    }
}
