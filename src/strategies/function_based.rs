//! One component per group of top-level functions, with imports duplicated
//! into every component whose body references them.

use crate::core::{ComponentSpec, SplitCandidate, StrategyKind, UnitKind};
use crate::strategies::{
    assign_imports, finalize_line_counts, is_blank_unit, unit_ids_of, SplitContext,
    StrategyGenerator,
};

pub struct FunctionBasedStrategy;

impl StrategyGenerator for FunctionBasedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FunctionBased
    }

    fn generate(&self, ctx: &SplitContext) -> Option<SplitCandidate> {
        let function_ids = unit_ids_of(ctx.tree, UnitKind::Function);
        if function_ids.len() < 2 {
            return None;
        }

        // Classes and sections stay together in a core component so every
        // non-import unit lands in exactly one output file.
        let other_ids: Vec<usize> = ctx
            .tree
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| !matches!(u.kind, UnitKind::Import | UnitKind::Function))
            .map(|(id, _)| id)
            .filter(|&id| !is_blank_unit(ctx.tree, id))
            .collect();

        let mut components = Vec::new();
        if !other_ids.is_empty() {
            let mut core = ComponentSpec::new(ctx.component_name("core"));
            core.unit_ids = other_ids;
            components.push(core);
        }
        for (index, group) in function_ids
            .chunks(ctx.config.max_functions_per_file)
            .enumerate()
        {
            let mut part = ComponentSpec::new(ctx.component_name(&format!("part{}", index + 1)));
            part.unit_ids = group.to_vec();
            components.push(part);
        }
        if components.len() < 2 {
            return None;
        }

        assign_imports(&mut components, ctx.tree);
        finalize_line_counts(&mut components, ctx.tree);
        Some(SplitCandidate {
            strategy: StrategyKind::FunctionBased,
            components,
            score: 0.0,
        })
    }
}
