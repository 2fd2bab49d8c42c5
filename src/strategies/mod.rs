//! Candidate strategy generators: pure functions from a structural tree to
//! proposed partitionings, one implementation per strategy variant.

use rayon::prelude::*;

use crate::config::{ScoringWeights, SplitConfig};
use crate::core::{ComponentSpec, SplitCandidate, StrategyKind, StructuralTree, UnitKind};
use crate::learning::{FileSignature, LearningMemory, NEUTRAL_BIAS};

pub mod class_based;
pub mod function_based;
pub mod module_based;
pub mod section_based;

pub use class_based::ClassBasedStrategy;
pub use function_based::FunctionBasedStrategy;
pub use module_based::ModuleBasedStrategy;
pub use section_based::SectionBasedStrategy;

/// Everything a generator needs for one run. Generators are pure and share
/// this read-only view, so running them concurrently is safe.
pub struct SplitContext<'a> {
    pub tree: &'a StructuralTree,
    pub config: &'a SplitConfig,
    pub file_stem: &'a str,
}

impl<'a> SplitContext<'a> {
    pub fn new(tree: &'a StructuralTree, config: &'a SplitConfig, file_stem: &'a str) -> Self {
        Self {
            tree,
            config,
            file_stem,
        }
    }

    pub fn component_name(&self, label: &str) -> String {
        format!(
            "{}_{}.{}",
            self.file_stem,
            label,
            self.tree.language.extension()
        )
    }
}

/// One candidate-producing strategy. Implementations must be pure.
pub trait StrategyGenerator: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Produce a candidate, or `None` when the strategy is not applicable
    /// (it would yield fewer than two components).
    fn generate(&self, ctx: &SplitContext) -> Option<SplitCandidate>;
}

/// Generate and score all applicable candidates.
///
/// The primary strategies run concurrently; module-based is generated only
/// when the primaries all collapse, and a trivial no-split candidate is the
/// guaranteed non-empty fallback.
pub fn generate_candidates(
    ctx: &SplitContext,
    learning: &LearningMemory,
    signature: &FileSignature,
    learning_enabled: bool,
) -> Vec<SplitCandidate> {
    let primary: Vec<Box<dyn StrategyGenerator>> = vec![
        Box::new(FunctionBasedStrategy),
        Box::new(ClassBasedStrategy),
        Box::new(SectionBasedStrategy),
    ];
    let mut candidates: Vec<SplitCandidate> = primary
        .par_iter()
        .filter_map(|generator| generator.generate(ctx))
        .collect();

    if candidates.is_empty() {
        if let Some(candidate) = ModuleBasedStrategy.generate(ctx) {
            candidates.push(candidate);
        }
    }
    if candidates.is_empty() {
        candidates.push(no_split_candidate(ctx));
    }

    for candidate in &mut candidates {
        let bias = if learning_enabled {
            learning.get_bias(signature, candidate.strategy)
        } else {
            NEUTRAL_BIAS
        };
        candidate.score =
            heuristic_score(&candidate.components, ctx.config, bias, &ctx.config.weights);
    }
    candidates
}

/// The single-component candidate returned when no strategy applies.
pub fn no_split_candidate(ctx: &SplitContext) -> SplitCandidate {
    let mut component = ComponentSpec::new(format!(
        "{}.{}",
        ctx.file_stem,
        ctx.tree.language.extension()
    ));
    component.unit_ids = (0..ctx.tree.units.len()).collect();
    component.line_count = ctx.tree.total_lines;
    component.oversized = ctx.tree.total_lines > ctx.config.max_lines_per_file;
    SplitCandidate {
        strategy: StrategyKind::NoSplit,
        components: vec![component],
        score: 0.0,
    }
}

/// Heuristic score: weighted combination of size balance (lower variance is
/// better), threshold compliance, and historical learning bias. Clamped to
/// [0, 1].
pub fn heuristic_score(
    components: &[ComponentSpec],
    config: &SplitConfig,
    bias: f64,
    weights: &ScoringWeights,
) -> f64 {
    if components.is_empty() {
        return 0.0;
    }
    let balance = balance_factor(components);
    let violations = components
        .iter()
        .filter(|c| c.line_count > config.max_lines_per_file)
        .count();
    let compliance = 1.0 - violations as f64 / components.len() as f64;

    let combined = weights.balance * balance + weights.compliance * compliance
        + weights.learning * bias;
    (combined / weights.heuristic_mass()).clamp(0.0, 1.0)
}

/// Inverse coefficient of variation of component sizes, mapped into (0, 1].
fn balance_factor(components: &[ComponentSpec]) -> f64 {
    if components.len() <= 1 {
        return 1.0;
    }
    let counts: Vec<f64> = components.iter().map(|c| c.line_count as f64).collect();
    let mean = counts.iter().sum::<f64>() / counts.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
    1.0 / (1.0 + variance.sqrt() / mean)
}

/// Whether `name` occurs in `text` as a standalone identifier token.
pub(crate) fn contains_identifier(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = text.as_bytes();
    for (index, _) in text.match_indices(name) {
        let before_ok = index == 0 || !is_ident_byte(bytes[index - 1]);
        let after = index + name.len();
        let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Duplicate import units into every component whose body references one of
/// their bound names. An unresolved name is not an error; it is left to fail
/// at syntax check if truly missing. Imports that no component needs are
/// attached to the first component so no original line is dropped.
pub(crate) fn assign_imports(components: &mut [ComponentSpec], tree: &StructuralTree) {
    let import_ids: Vec<usize> = tree
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.kind == UnitKind::Import)
        .map(|(id, _)| id)
        .collect();
    if import_ids.is_empty() || components.is_empty() {
        return;
    }

    for component in components.iter_mut() {
        let body_text: String = component
            .unit_ids
            .iter()
            .filter(|id| tree.units[**id].kind != UnitKind::Import)
            .map(|&id| tree.unit_text(&tree.units[id]))
            .collect::<Vec<_>>()
            .join("\n");
        for &import_id in &import_ids {
            if component.unit_ids.contains(&import_id) {
                continue;
            }
            let import = &tree.units[import_id];
            let needed = import.bindings.is_empty()
                || import
                    .bindings
                    .iter()
                    .any(|name| contains_identifier(&body_text, name));
            if needed {
                component.import_ids.push(import_id);
            }
        }
    }

    // No original line may be dropped: orphaned imports go to the first
    // component.
    for &import_id in &import_ids {
        let covered = components
            .iter()
            .any(|c| c.unit_ids.contains(&import_id) || c.import_ids.contains(&import_id));
        if !covered {
            components[0].import_ids.push(import_id);
        }
    }
}

/// Recompute each component's denormalized line count from its units.
pub(crate) fn finalize_line_counts(components: &mut [ComponentSpec], tree: &StructuralTree) {
    for component in components.iter_mut() {
        component.line_count = component
            .import_ids
            .iter()
            .chain(component.unit_ids.iter())
            .map(|&id| tree.units[id].line_count())
            .sum();
    }
}

/// Whitespace-only synthetic sections are separator noise; grouping
/// strategies skip them rather than emit blank components.
pub(crate) fn is_blank_unit(tree: &StructuralTree, unit_id: usize) -> bool {
    tree.unit_text(&tree.units[unit_id]).trim().is_empty()
}

/// Unit ids of a given kind, in source order.
pub(crate) fn unit_ids_of(tree: &StructuralTree, kind: UnitKind) -> Vec<usize> {
    tree.units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.kind == kind)
        .map(|(id, _)| id)
        .collect()
}
