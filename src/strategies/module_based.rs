//! Concern grouping by shared name prefix. A last resort for large flat
//! files where the other strategies collapse to a single component.

use std::collections::BTreeMap;

use crate::core::{ComponentSpec, SplitCandidate, StrategyKind, UnitKind};
use crate::strategies::{
    assign_imports, finalize_line_counts, is_blank_unit, SplitContext, StrategyGenerator,
};

pub struct ModuleBasedStrategy;

impl StrategyGenerator for ModuleBasedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ModuleBased
    }

    fn generate(&self, ctx: &SplitContext) -> Option<SplitCandidate> {
        // BTreeMap keeps group order deterministic.
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (id, unit) in ctx.tree.units.iter().enumerate() {
            if unit.kind == UnitKind::Import || is_blank_unit(ctx.tree, id) {
                continue;
            }
            let label = unit
                .name
                .as_deref()
                .map(name_prefix)
                .unwrap_or_else(|| "core".to_string());
            groups.entry(label).or_default().push(id);
        }
        if groups.len() < 2 {
            return None;
        }

        let mut components: Vec<ComponentSpec> = groups
            .into_iter()
            .map(|(label, unit_ids)| {
                let mut component = ComponentSpec::new(ctx.component_name(&label));
                component.unit_ids = unit_ids;
                component
            })
            .collect();

        assign_imports(&mut components, ctx.tree);
        finalize_line_counts(&mut components, ctx.tree);
        Some(SplitCandidate {
            strategy: StrategyKind::ModuleBased,
            components,
            score: 0.0,
        })
    }
}

/// Leading name segment: up to the first underscore for snake_case, up to
/// the second capital for CamelCase, lowercased either way.
fn name_prefix(name: &str) -> String {
    if let Some(first) = name.split('_').next() {
        if first.len() < name.len() {
            return first.to_lowercase();
        }
    }
    let mut end = name.len();
    for (index, c) in name.char_indices() {
        if index > 0 && c.is_uppercase() {
            end = index;
            break;
        }
    }
    name[..end].to_lowercase()
}
