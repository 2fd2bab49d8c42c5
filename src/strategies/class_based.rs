//! One component per class (grouped up to the class limit), with free
//! functions and loose sections bucketed into a shared utilities component.

use crate::core::{ComponentSpec, SplitCandidate, StrategyKind, UnitKind};
use crate::strategies::{
    assign_imports, finalize_line_counts, is_blank_unit, unit_ids_of, SplitContext,
    StrategyGenerator,
};

pub struct ClassBasedStrategy;

impl StrategyGenerator for ClassBasedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ClassBased
    }

    fn generate(&self, ctx: &SplitContext) -> Option<SplitCandidate> {
        let class_ids = unit_ids_of(ctx.tree, UnitKind::Class);
        if class_ids.is_empty() {
            return None;
        }

        let mut components = Vec::new();
        for (index, group) in class_ids
            .chunks(ctx.config.max_classes_per_file)
            .enumerate()
        {
            let label = group_label(ctx, group, index);
            let mut component = ComponentSpec::new(ctx.component_name(&label));
            component.unit_ids = group.to_vec();
            components.push(component);
        }

        let utility_ids: Vec<usize> = ctx
            .tree
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| matches!(u.kind, UnitKind::Function | UnitKind::Section))
            .map(|(id, _)| id)
            .filter(|&id| !is_blank_unit(ctx.tree, id))
            .collect();
        if !utility_ids.is_empty() {
            let mut utilities = ComponentSpec::new(ctx.component_name("utilities"));
            utilities.unit_ids = utility_ids;
            components.push(utilities);
        }
        if components.len() < 2 {
            return None;
        }

        assign_imports(&mut components, ctx.tree);
        finalize_line_counts(&mut components, ctx.tree);
        Some(SplitCandidate {
            strategy: StrategyKind::ClassBased,
            components,
            score: 0.0,
        })
    }
}

/// A group of one class is named after the class; larger groups get a
/// positional label.
fn group_label(ctx: &SplitContext, group: &[usize], index: usize) -> String {
    if group.len() == 1 {
        if let Some(name) = &ctx.tree.units[group[0]].name {
            return to_snake_case(name);
        }
    }
    format!("classes{}", index + 1)
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::analyzer_for;
    use crate::config::SplitConfig;
    use crate::core::Language;
    use indoc::indoc;

    fn generate(source: &str, config: &SplitConfig) -> Option<SplitCandidate> {
        let tree = analyzer_for(Language::Python).analyze(source).unwrap();
        let ctx = SplitContext::new(&tree, config, "models");
        ClassBasedStrategy.generate(&ctx)
    }

    #[test]
    fn one_component_per_class_plus_utilities() {
        let source = indoc! {r#"
            import json

            class Parser:
                def parse(self, text):
                    return json.loads(text)

            class Emitter:
                def emit(self, value):
                    return json.dumps(value)

            def helper():
                return 1
        "#};
        let config = SplitConfig {
            max_classes_per_file: 1,
            ..Default::default()
        };
        let candidate = generate(source, &config).unwrap();
        let names: Vec<&str> = candidate
            .components
            .iter()
            .map(|c| c.file_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["models_parser.py", "models_emitter.py", "models_utilities.py"]
        );
        // Both class components use json, the helper does not.
        assert!(!candidate.components[0].import_ids.is_empty());
        assert!(!candidate.components[1].import_ids.is_empty());
    }

    #[test]
    fn no_classes_means_not_applicable() {
        let source = "def a():\n    pass\n\ndef b():\n    pass\n";
        assert!(generate(source, &SplitConfig::default()).is_none());
    }

    #[test]
    fn snake_case_labels() {
        assert_eq!(to_snake_case("HttpClient"), "http_client");
        assert_eq!(to_snake_case("Parser"), "parser");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }
}
