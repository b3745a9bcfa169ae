pub mod extractors;
pub mod image_processor;
pub mod medicines;
pub mod ocr;
pub mod patterns;
pub mod scoring;

pub use extractors::FieldExtractor;
pub use image_processor::{ImageProcessor, ImageVariant};
pub use medicines::MedicineExtractor;
pub use ocr::{EngineKind, EngineSet, OcrArbiter, OcrCandidate, TextExtractionEngine};
pub use scoring::ConfidenceScorer;
