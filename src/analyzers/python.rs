//! Python structural analyzer built on tree-sitter.
//!
//! tree-sitter is error-tolerant, so a parse "succeeding" is not enough:
//! any error or missing node in the tree is reported as a parse failure
//! with the location of the first offending node.

use tree_sitter::{Node, Parser, Point, Tree};

use crate::analyzers::Analyzer;
use crate::core::{Language, SourceUnit, StructuralTree, UnitKind};
use crate::errors::{Result, SplitError};

pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn analyze(&self, source: &str) -> Result<StructuralTree> {
        let tree = parse_python(source)?;
        let root = tree.root_node();
        let mut units = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            units.push(unit_for_node(child, source));
        }
        Ok(StructuralTree::new(Language::Python, source, units))
    }

    fn check_syntax(&self, source: &str) -> Result<()> {
        parse_python(source).map(|_| ())
    }
}

fn parse_python(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SplitError::parse(0, 0, format!("failed to load python grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| SplitError::parse(0, 0, "python parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let point = first_error_point(root).unwrap_or_else(|| root.start_position());
        return Err(SplitError::parse(
            point.row + 1,
            point.column,
            "invalid python syntax",
        ));
    }
    Ok(tree)
}

fn first_error_point(node: Node) -> Option<Point> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(point) = first_error_point(child) {
            return Some(point);
        }
    }
    None
}

fn line_range(node: Node) -> (usize, usize) {
    let start = node.start_position().row + 1;
    let end_pos = node.end_position();
    // An end position at column 0 means the node's text stopped at the end
    // of the previous row.
    let end_row = if end_pos.column == 0 && end_pos.row > node.start_position().row {
        end_pos.row - 1
    } else {
        end_pos.row
    };
    (start, (end_row + 1).max(start))
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn unit_for_node(node: Node, source: &str) -> SourceUnit {
    let (start, end) = line_range(node);
    match node.kind() {
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            SourceUnit::new(UnitKind::Import, None, start, end)
                .with_bindings(import_bindings(node, source))
        }
        "function_definition" => function_unit(node, source, start, end),
        "class_definition" => class_unit(node, source, start, end),
        "decorated_definition" => {
            // The decorated span includes the decorators; classification
            // comes from the wrapped definition.
            match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => {
                    function_unit_named(def, node, source, start, end)
                }
                Some(def) if def.kind() == "class_definition" => {
                    class_unit_named(def, node, source, start, end)
                }
                _ => SourceUnit::new(UnitKind::Section, None, start, end),
            }
        }
        _ => SourceUnit::new(UnitKind::Section, None, start, end),
    }
}

fn definition_name(node: Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
}

fn function_unit(node: Node, source: &str, start: usize, end: usize) -> SourceUnit {
    SourceUnit::new(UnitKind::Function, definition_name(node, source), start, end)
        .with_complexity(node_complexity(node))
}

fn function_unit_named(
    def: Node,
    span_node: Node,
    source: &str,
    start: usize,
    end: usize,
) -> SourceUnit {
    SourceUnit::new(UnitKind::Function, definition_name(def, source), start, end)
        .with_complexity(node_complexity(span_node))
}

fn class_unit(node: Node, source: &str, start: usize, end: usize) -> SourceUnit {
    SourceUnit::new(UnitKind::Class, definition_name(node, source), start, end)
        .with_members(class_methods(node, source))
        .with_complexity(node_complexity(node))
}

fn class_unit_named(
    def: Node,
    span_node: Node,
    source: &str,
    start: usize,
    end: usize,
) -> SourceUnit {
    SourceUnit::new(UnitKind::Class, definition_name(def, source), start, end)
        .with_members(class_methods(def, source))
        .with_complexity(node_complexity(span_node))
}

/// Methods one level inside a class body; nested deeper is ignored.
fn class_methods(class_node: Node, source: &str) -> Vec<SourceUnit> {
    let Some(body) = class_node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut methods = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        let def = match child.kind() {
            "function_definition" => Some(child),
            "decorated_definition" => child
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        if let Some(def) = def {
            let (start, end) = line_range(child);
            methods.push(
                SourceUnit::new(UnitKind::Method, definition_name(def, source), start, end)
                    .with_complexity(node_complexity(child)),
            );
        }
    }
    methods
}

/// Names bound by an import statement. A wildcard import binds nothing,
/// which marks the unit as un-provably-unused downstream.
fn import_bindings(node: Node, source: &str) -> Vec<String> {
    let mut bindings = Vec::new();
    let mut cursor = node.walk();
    for name_node in node.children_by_field_name("name", &mut cursor) {
        match name_node.kind() {
            "aliased_import" => {
                if let Some(alias) = name_node.child_by_field_name("alias") {
                    bindings.push(node_text(alias, source).to_string());
                }
            }
            "dotted_name" => {
                let text = node_text(name_node, source);
                if let Some(first) = text.split('.').next() {
                    if !first.is_empty() {
                        bindings.push(first.to_string());
                    }
                }
            }
            _ => bindings.push(node_text(name_node, source).to_string()),
        }
    }
    bindings
}

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "while_statement",
    "for_statement",
    "except_clause",
    "with_statement",
    "conditional_expression",
    "boolean_operator",
    "case_clause",
];

const NESTING_KINDS: &[&str] = &[
    "if_statement",
    "while_statement",
    "for_statement",
    "try_statement",
    "with_statement",
    "match_statement",
    "function_definition",
    "class_definition",
];

/// Complexity proxy: branch node count plus maximum nesting depth.
fn node_complexity(node: Node) -> u32 {
    let mut branches = 0u32;
    let mut max_depth = 0u32;
    walk_complexity(node, 0, &mut branches, &mut max_depth);
    branches + max_depth
}

fn walk_complexity(node: Node, depth: u32, branches: &mut u32, max_depth: &mut u32) {
    let kind = node.kind();
    if BRANCH_KINDS.contains(&kind) {
        *branches += 1;
    }
    let next_depth = if NESTING_KINDS.contains(&kind) {
        depth + 1
    } else {
        depth
    };
    *max_depth = (*max_depth).max(next_depth);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk_complexity(child, next_depth, branches, max_depth);
    }
}
