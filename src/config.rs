use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{Result, SplitError};

/// Weights for the deterministic candidate score.
///
/// The heuristic score of a candidate is the weighted combination of its
/// size balance, its threshold compliance, and the historical learning bias
/// for its strategy. `ai_blend` controls how much an AI-assisted confidence
/// moves the final score when AI analysis is enabled; the default of 0.5 is
/// a plain average and is policy, not law.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight for component size balance (0.0-1.0)
    #[serde(default = "default_balance_weight")]
    pub balance: f64,

    /// Weight for threshold compliance (0.0-1.0)
    #[serde(default = "default_compliance_weight")]
    pub compliance: f64,

    /// Weight for historical learning bias (0.0-1.0)
    #[serde(default = "default_learning_weight")]
    pub learning: f64,

    /// Blend factor between heuristic score and AI confidence (0.0-1.0)
    #[serde(default = "default_ai_blend")]
    pub ai_blend: f64,
}

fn default_balance_weight() -> f64 {
    0.40
}

fn default_compliance_weight() -> f64 {
    0.35
}

fn default_learning_weight() -> f64 {
    0.25
}

fn default_ai_blend() -> f64 {
    0.5
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            balance: default_balance_weight(),
            compliance: default_compliance_weight(),
            learning: default_learning_weight(),
            ai_blend: default_ai_blend(),
        }
    }
}

impl ScoringWeights {
    fn is_valid_weight(weight: f64) -> bool {
        (0.0..=1.0).contains(&weight)
    }

    fn validate_weight(weight: f64, name: &str) -> Result<()> {
        if Self::is_valid_weight(weight) {
            Ok(())
        } else {
            Err(SplitError::config(format!(
                "{name} weight must be between 0.0 and 1.0, got {weight}"
            )))
        }
    }

    /// Validate all weights are in range and the heuristic weights carry
    /// any mass at all.
    pub fn validate(&self) -> Result<()> {
        Self::validate_weight(self.balance, "balance")?;
        Self::validate_weight(self.compliance, "compliance")?;
        Self::validate_weight(self.learning, "learning")?;
        Self::validate_weight(self.ai_blend, "ai_blend")?;

        if self.balance + self.compliance + self.learning <= 0.0 {
            return Err(SplitError::config(
                "heuristic weights (balance, compliance, learning) must not all be zero",
            ));
        }
        Ok(())
    }

    /// Sum of the heuristic weights, used to normalize the combined score.
    pub fn heuristic_mass(&self) -> f64 {
        self.balance + self.compliance + self.learning
    }
}

/// Caller-supplied configuration for one split operation.
///
/// Immutable for the duration of one split. Deserializes with per-field
/// defaults so partial JSON configs are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Maximum lines an output component should have
    #[serde(default = "default_max_lines_per_file")]
    pub max_lines_per_file: usize,

    /// Maximum top-level functions grouped into one component
    #[serde(default = "default_max_functions_per_file")]
    pub max_functions_per_file: usize,

    /// Maximum classes grouped into one component
    #[serde(default = "default_max_classes_per_file")]
    pub max_classes_per_file: usize,

    /// Consult the AI completion collaborator when selecting a candidate
    #[serde(default)]
    pub use_ai_analysis: bool,

    /// Record outcomes to (and read biases from) learning memory
    #[serde(default = "default_true")]
    pub enable_learning: bool,

    /// Snapshot the original content before any write
    #[serde(default = "default_true")]
    pub create_backup: bool,

    /// Re-parse every written component before committing
    #[serde(default = "default_true")]
    pub validate_syntax: bool,

    /// Minimum confidence for an AI-blended selection to stand on its own
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Upper bound on the single AI completion call, in milliseconds
    #[serde(default = "default_ai_timeout_ms")]
    pub ai_timeout_ms: u64,

    /// Where component files are written; defaults to the original's directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Where the backup snapshot is written; defaults to the output directory
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    #[serde(default)]
    pub weights: ScoringWeights,
}

fn default_max_lines_per_file() -> usize {
    500
}

fn default_max_functions_per_file() -> usize {
    10
}

fn default_max_classes_per_file() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f64 {
    0.6
}

fn default_ai_timeout_ms() -> u64 {
    3000
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_lines_per_file: default_max_lines_per_file(),
            max_functions_per_file: default_max_functions_per_file(),
            max_classes_per_file: default_max_classes_per_file(),
            use_ai_analysis: false,
            enable_learning: true,
            create_backup: true,
            validate_syntax: true,
            confidence_threshold: default_confidence_threshold(),
            ai_timeout_ms: default_ai_timeout_ms(),
            output_dir: None,
            backup_dir: None,
            weights: ScoringWeights::default(),
        }
    }
}

impl SplitConfig {
    /// Fail fast on a self-contradictory configuration.
    ///
    /// This is the only precondition check that surfaces as an `Err` from
    /// the orchestrator; everything downstream reports through the result.
    pub fn validate(&self) -> Result<()> {
        if self.max_lines_per_file == 0 {
            return Err(SplitError::config("max_lines_per_file must be at least 1"));
        }
        if self.max_functions_per_file == 0 {
            return Err(SplitError::config(
                "max_functions_per_file must be at least 1",
            ));
        }
        if self.max_classes_per_file == 0 {
            return Err(SplitError::config("max_classes_per_file must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SplitError::config(format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            )));
        }
        if self.use_ai_analysis && self.ai_timeout_ms == 0 {
            return Err(SplitError::config(
                "ai_timeout_ms must be nonzero when use_ai_analysis is set",
            ));
        }
        self.weights.validate()
    }

    /// Timeout for the single AI completion attempt.
    pub fn ai_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ai_timeout_ms)
    }
}
