pub mod analysis;
pub mod document;
pub mod paper;

pub use analysis::{AnalysisResult, ExperimentalData, StatisticalSignificance};
pub use document::{Document, GeneratedSection, SectionMap, SectionOutline};
pub use paper::{LiteratureReview, PaperRecord};

#[cfg(test)]
mod tests;
