//! Greedy line-window packing: consecutive units accumulate until the line
//! limit would be exceeded. A unit is never split across components; a unit
//! that alone exceeds the limit becomes a flagged single-unit component.
//!
//! Window capacity accounts for the import units the window's body will pull
//! in, so duplicated imports cannot push a packed window past the limit.

use crate::core::{ComponentSpec, SplitCandidate, StrategyKind, UnitKind};
use crate::strategies::{
    assign_imports, contains_identifier, finalize_line_counts, unit_ids_of, SplitContext,
    StrategyGenerator,
};

pub struct SectionBasedStrategy;

impl StrategyGenerator for SectionBasedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SectionBased
    }

    fn generate(&self, ctx: &SplitContext) -> Option<SplitCandidate> {
        let tree = ctx.tree;
        let max_lines = ctx.config.max_lines_per_file;
        let import_ids = unit_ids_of(tree, UnitKind::Import);

        let mut windows: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut body_lines = 0usize;
        // Import ids the current window will duplicate when rendered.
        let mut needed: Vec<usize> = Vec::new();

        for (id, unit) in tree.units.iter().enumerate() {
            let unit_lines = unit.line_count();
            if unit_lines > max_lines {
                // Oversized unit: close the window, emit it alone.
                if !current.is_empty() {
                    windows.push(std::mem::take(&mut current));
                    body_lines = 0;
                    needed.clear();
                }
                windows.push(vec![id]);
                continue;
            }

            let unit_needs = unit_import_needs(tree, &import_ids, id, unit);
            let mut merged = needed.clone();
            for &import_id in &unit_needs {
                if !merged.contains(&import_id) {
                    merged.push(import_id);
                }
            }
            // An import placed in the window as a body unit is not duplicated.
            merged.retain(|&import_id| import_id != id && !current.contains(&import_id));

            let import_lines: usize = merged
                .iter()
                .map(|&import_id| tree.units[import_id].line_count())
                .sum();
            if !current.is_empty() && body_lines + unit_lines + import_lines > max_lines {
                windows.push(std::mem::take(&mut current));
                body_lines = 0;
                merged = unit_needs;
            }
            current.push(id);
            body_lines += unit_lines;
            needed = merged;
        }
        if !current.is_empty() {
            windows.push(current);
        }
        if windows.len() < 2 {
            return None;
        }

        let mut components: Vec<ComponentSpec> = windows
            .into_iter()
            .enumerate()
            .map(|(index, unit_ids)| {
                let mut component =
                    ComponentSpec::new(ctx.component_name(&format!("section{}", index + 1)));
                component.unit_ids = unit_ids;
                component
            })
            .collect();

        // Later windows do not contain the file's import units; duplicate
        // the ones their bodies reference.
        assign_imports(&mut components, tree);
        finalize_line_counts(&mut components, tree);
        // Multi-unit windows stay within the limit by construction; only a
        // single unit (with its imports) may exceed it, and that is flagged.
        for component in &mut components {
            component.oversized =
                component.unit_ids.len() == 1 && component.line_count > max_lines;
        }
        Some(SplitCandidate {
            strategy: StrategyKind::SectionBased,
            components,
            score: 0.0,
        })
    }
}

/// Import ids the unit's text references (empty for import units).
fn unit_import_needs(
    tree: &crate::core::StructuralTree,
    import_ids: &[usize],
    id: usize,
    unit: &crate::core::SourceUnit,
) -> Vec<usize> {
    if unit.kind == UnitKind::Import {
        return Vec::new();
    }
    let text = tree.unit_text(unit);
    import_ids
        .iter()
        .copied()
        .filter(|&import_id| import_id != id)
        .filter(|&import_id| {
            let import = &tree.units[import_id];
            import.bindings.is_empty()
                || import
                    .bindings
                    .iter()
                    .any(|name| contains_identifier(&text, name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::analyzer_for;
    use crate::config::SplitConfig;
    use crate::core::Language;

    fn source_with_functions(count: usize, body_lines: usize) -> String {
        let mut out = String::new();
        for i in 0..count {
            out.push_str(&format!("fn func_{i}() {{\n"));
            for j in 0..body_lines {
                out.push_str(&format!("    let _x{j} = {j};\n"));
            }
            out.push_str("}\n\n");
        }
        out
    }

    fn generate(source: &str, config: &SplitConfig) -> Option<SplitCandidate> {
        let tree = analyzer_for(Language::Rust).analyze(source).unwrap();
        let ctx = SplitContext::new(&tree, config, "big");
        SectionBasedStrategy.generate(&ctx)
    }

    #[test]
    fn respects_line_limit_for_normal_units() {
        let source = source_with_functions(10, 8);
        let config = SplitConfig {
            max_lines_per_file: 40,
            ..Default::default()
        };
        let candidate = generate(&source, &config).unwrap();
        assert!(candidate.components.len() >= 2);
        for component in &candidate.components {
            assert!(
                component.oversized || component.line_count <= 40,
                "component {} has {} lines",
                component.file_name,
                component.line_count
            );
        }
    }

    #[test]
    fn duplicated_imports_stay_within_window_budget() {
        let mut source = String::from("use std::fmt;\n\n");
        for i in 0..3 {
            source.push_str(&format!("fn show_{i}(v: &dyn fmt::Debug) {{\n"));
            for j in 0..4 {
                source.push_str(&format!("    let _s{j} = format!(\"{{v:?}}\");\n"));
            }
            source.push_str("}\n\n");
        }
        let config = SplitConfig {
            max_lines_per_file: 12,
            ..Default::default()
        };
        let candidate = generate(&source, &config).unwrap();
        assert!(candidate.components.len() >= 2);
        for component in &candidate.components {
            assert!(
                component.oversized || component.line_count <= 12,
                "component {} has {} lines after import duplication",
                component.file_name,
                component.line_count
            );
        }
    }

    #[test]
    fn oversized_unit_is_flagged_not_blocked() {
        let mut source = source_with_functions(2, 3);
        source.push_str("fn giant() {\n");
        for i in 0..60 {
            source.push_str(&format!("    let _g{i} = {i};\n"));
        }
        source.push_str("}\n");
        let config = SplitConfig {
            max_lines_per_file: 20,
            ..Default::default()
        };
        let candidate = generate(&source, &config).unwrap();
        let flagged: Vec<_> = candidate
            .components
            .iter()
            .filter(|c| c.oversized)
            .collect();
        assert_eq!(flagged.len(), 1);
        assert!(flagged[0].line_count > 20);
        assert_eq!(flagged[0].unit_ids.len(), 1);
    }

    #[test]
    fn small_file_is_not_applicable() {
        let source = "fn a() {}\n";
        assert!(generate(source, &SplitConfig::default()).is_none());
    }
}
