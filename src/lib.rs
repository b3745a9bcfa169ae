pub mod analyzer;
pub mod config;
pub mod intake;
pub mod models;
pub mod processing;
pub mod utils;

pub use analyzer::{Capabilities, PrescriptionAnalyzer};
pub use config::AnalyzerConfig;
pub use intake::UploadPolicy;
pub use utils::AnalyzerError;
