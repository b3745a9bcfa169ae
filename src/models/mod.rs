pub mod data;
pub mod knowledge;
pub mod response;

pub use data::*;
pub use knowledge::{KnowledgeBase, MedicineInfo};
pub use response::AnalysisResponse;
