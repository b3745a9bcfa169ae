pub mod error;
pub mod text;

pub use error::AnalyzerError;
