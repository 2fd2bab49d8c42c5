use crate::core::{Language, StructuralTree};
use crate::errors::Result;

pub mod python;
pub mod rust;

pub use python::PythonAnalyzer;
pub use rust::RustAnalyzer;

/// Per-language structural analysis. Pure: no side effects, no resources.
pub trait Analyzer: Send + Sync {
    fn language(&self) -> Language;

    /// Parse the source into a complete structural partition.
    ///
    /// Fails with a location-carrying parse error if the source does not
    /// parse; the orchestrator treats that as fatal before any mutation.
    fn analyze(&self, source: &str) -> Result<StructuralTree>;

    /// Syntax-only check used by post-write validation.
    fn check_syntax(&self, source: &str) -> Result<()>;
}

/// Registry lookup: one analyzer per supported language.
pub fn analyzer_for(language: Language) -> Box<dyn Analyzer> {
    match language {
        Language::Rust => Box::new(RustAnalyzer::new()),
        Language::Python => Box::new(PythonAnalyzer::new()),
    }
}
