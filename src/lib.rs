//! Structure-aware source file splitting.
//!
//! Fission analyzes an oversized source file into a complete partition of
//! structural units, proposes candidate partitionings through a fixed set of
//! strategies, scores them (optionally blending in an AI judgment), applies
//! the winner with backup and post-write validation, and feeds the outcome
//! back into a learning memory that biases future selections.
//!
//! The entry point is [`Splitter::split`]; it returns a [`SplitResult`] for
//! every operational outcome and errs only on invalid configuration.

pub mod analyzers;
pub mod config;
pub mod core;
pub mod errors;
pub mod io;
pub mod learning;
pub mod scoring;
pub mod splitter;
pub mod strategies;

pub use config::{ScoringWeights, SplitConfig};
pub use core::{
    ComponentSpec, Language, RationaleSource, ScoredCandidate, SourceUnit, SplitCandidate,
    SplitResult, StrategyKind, StructuralTree, UnitKind,
};
pub use errors::{Result, SplitError};
pub use io::{FileSystem, RealFileSystem};
pub use learning::{FileSignature, LearningMemory};
pub use scoring::{CompletionProvider, ProviderError};
pub use splitter::Splitter;
