pub mod types;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use types::{
    ComponentSpec, RationaleSource, ScoredCandidate, SourceUnit, SplitCandidate, SplitResult,
    StrategyKind, StructuralTree, UnitKind,
};

/// Source languages the splitter can analyze and validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
}

impl Language {
    /// Determine the language from a file extension, if supported.
    pub fn from_path(path: &Path) -> Option<Language> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("rs") => Some(Language::Rust),
            Some("py") | Some("pyi") => Some(Language::Python),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
        }
    }

    /// Canonical file extension for component output files.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Rust => "rs",
            Language::Python => "py",
        }
    }
}
