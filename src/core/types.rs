//! Data model for split operations: structural units, candidates, results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::Language;

/// Kind of a structurally identified source fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Import,
    Function,
    Class,
    /// A method nested one level inside a class; informational only, nested
    /// inside its class unit's range.
    Method,
    /// Module-level statements between declarations, grouped synthetically.
    Section,
}

/// A structural fragment of the original file. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub kind: UnitKind,
    /// Identifying name; `None` for anonymous section blocks.
    pub name: Option<String>,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
    /// Structural complexity proxy: branch count plus max nesting depth.
    /// An ordering signal, not a cyclomatic-complexity implementation.
    pub complexity: u32,
    /// Method children of a class unit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<SourceUnit>,
    /// Names bound by an import unit. Empty means "cannot prove unused":
    /// such imports are duplicated into every component.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<String>,
}

impl SourceUnit {
    pub fn new(kind: UnitKind, name: Option<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            kind,
            name,
            start_line,
            end_line,
            complexity: 0,
            members: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn section(start_line: usize, end_line: usize) -> Self {
        Self::new(UnitKind::Section, None, start_line, end_line)
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_members(mut self, members: Vec<SourceUnit>) -> Self {
        self.members = members;
        self
    }

    pub fn with_bindings(mut self, bindings: Vec<String>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// The analyzer's output: every line of the source attributed to exactly one
/// top-level unit, in order. Owns the units and a copy of the source text so
/// downstream generators can render components without re-reading anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralTree {
    pub language: Language,
    pub total_lines: usize,
    pub units: Vec<SourceUnit>,
    source: String,
}

impl StructuralTree {
    /// Build a tree from declared units, normalizing them into a complete
    /// partition: sorted by position, same-line overlaps clipped, and every
    /// gap (leading comments, blank runs, trailing text) filled with a
    /// synthetic section unit.
    pub fn new(language: Language, source: &str, units: Vec<SourceUnit>) -> Self {
        let total_lines = source.lines().count();
        let units = Self::normalize(units, total_lines);
        Self {
            language,
            total_lines,
            units,
            source: source.to_string(),
        }
    }

    fn normalize(mut units: Vec<SourceUnit>, total_lines: usize) -> Vec<SourceUnit> {
        if total_lines == 0 {
            return Vec::new();
        }
        units.sort_by_key(|u| (u.start_line, u.end_line));

        let mut normalized: Vec<SourceUnit> = Vec::with_capacity(units.len());
        let mut next_line = 1usize;
        for mut unit in units {
            if unit.end_line > total_lines {
                unit.end_line = total_lines;
            }
            if unit.end_line < next_line {
                // Fully swallowed by the previous unit (same-line items).
                continue;
            }
            if unit.start_line < next_line {
                unit.start_line = next_line;
            }
            if unit.start_line > next_line {
                normalized.push(SourceUnit::section(next_line, unit.start_line - 1));
            }
            next_line = unit.end_line + 1;
            normalized.push(unit);
        }
        if next_line <= total_lines {
            normalized.push(SourceUnit::section(next_line, total_lines));
        }
        normalized
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The text of a line range, 1-indexed inclusive on both ends.
    pub fn lines_text(&self, start_line: usize, end_line: usize) -> String {
        self.source
            .lines()
            .skip(start_line.saturating_sub(1))
            .take(end_line.saturating_sub(start_line) + 1)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn unit_text(&self, unit: &SourceUnit) -> String {
        self.lines_text(unit.start_line, unit.end_line)
    }

    pub fn count_of(&self, kind: UnitKind) -> usize {
        self.units.iter().filter(|u| u.kind == kind).count()
    }

    /// Partition-completeness check: every line covered exactly once, in order.
    pub fn verify_partition(&self) -> bool {
        let mut expected = 1usize;
        for unit in &self.units {
            if unit.start_line != expected || unit.end_line < unit.start_line {
                return false;
            }
            expected = unit.end_line + 1;
        }
        expected == self.total_lines + 1
    }
}

/// The closed set of partitioning strategies.
///
/// Derived ordering doubles as the fixed tie-break preference:
/// function-based beats class-based beats section-based beats module-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    FunctionBased,
    ClassBased,
    SectionBased,
    ModuleBased,
    /// The trivial outcome for files already within every threshold.
    NoSplit,
}

impl StrategyKind {
    pub fn tag(&self) -> &'static str {
        match self {
            StrategyKind::FunctionBased => "function-based",
            StrategyKind::ClassBased => "class-based",
            StrategyKind::SectionBased => "section-based",
            StrategyKind::ModuleBased => "module-based",
            StrategyKind::NoSplit => "no-split",
        }
    }
}

/// One output file of a proposed partitioning.
///
/// `unit_ids` and `import_ids` index into the tree's unit list; imports may
/// be duplicated across components, body units never are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub file_name: String,
    pub unit_ids: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_ids: Vec<usize>,
    /// Denormalized aggregate line count (imports included).
    pub line_count: usize,
    /// Set when a single unit alone exceeds the line limit; flagged, never
    /// blocked.
    #[serde(default)]
    pub oversized: bool,
    /// Final written path, filled in by the backup/validation manager.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ComponentSpec {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            unit_ids: Vec::new(),
            import_ids: Vec::new(),
            line_count: 0,
            oversized: false,
            path: None,
        }
    }

    /// Render the component's content: duplicated imports first, then the
    /// body units in original order, blank-line separated.
    pub fn render(&self, tree: &StructuralTree) -> String {
        let mut blocks: Vec<String> = Vec::with_capacity(self.import_ids.len() + self.unit_ids.len());
        for &id in &self.import_ids {
            blocks.push(tree.unit_text(&tree.units[id]));
        }
        for &id in &self.unit_ids {
            blocks.push(tree.unit_text(&tree.units[id]));
        }
        let mut content = blocks.join("\n\n");
        content.push('\n');
        content
    }
}

/// One proposed partitioning; transient within one orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCandidate {
    pub strategy: StrategyKind,
    pub components: Vec<ComponentSpec>,
    /// Raw heuristic score in [0, 1].
    pub score: f64,
}

/// Where the final confidence of the winning candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RationaleSource {
    Heuristic,
    Ai,
    LearnedBias,
}

/// The selector's output: a candidate plus its final confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: SplitCandidate,
    pub confidence: f64,
    pub rationale: RationaleSource,
}

/// The outcome of one split invocation. Created once, returned, not mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResult {
    pub success: bool,
    /// Winning strategy; `None` when failure happened before selection.
    pub strategy: Option<StrategyKind>,
    pub components: Vec<ComponentSpec>,
    pub confidence: f64,
    pub rationale: RationaleSource,
    pub backup_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    pub validation_passed: bool,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SplitResult {
    /// A failed result; the original file is guaranteed unchanged.
    pub fn failure(
        strategy: Option<StrategyKind>,
        error_message: String,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: false,
            strategy,
            components: Vec::new(),
            confidence: 0.0,
            rationale: RationaleSource::Heuristic,
            backup_created: false,
            backup_path: None,
            validation_passed: false,
            processing_time_ms,
            error_message: Some(error_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit(kind: UnitKind, start: usize, end: usize) -> SourceUnit {
        SourceUnit::new(kind, None, start, end)
    }

    #[test]
    fn normalization_fills_leading_and_trailing_gaps() {
        let source = "a\nb\nc\nd\ne\nf\n";
        let tree = StructuralTree::new(
            Language::Rust,
            source,
            vec![unit(UnitKind::Function, 3, 4)],
        );
        assert_eq!(tree.units.len(), 3);
        assert_eq!(tree.units[0].kind, UnitKind::Section);
        assert_eq!((tree.units[0].start_line, tree.units[0].end_line), (1, 2));
        assert_eq!(tree.units[1].kind, UnitKind::Function);
        assert_eq!((tree.units[2].start_line, tree.units[2].end_line), (5, 6));
        assert!(tree.verify_partition());
    }

    #[test]
    fn normalization_clips_same_line_overlap() {
        let source = "x\ny\nz\n";
        let tree = StructuralTree::new(
            Language::Rust,
            source,
            vec![unit(UnitKind::Import, 1, 1), unit(UnitKind::Import, 1, 2)],
        );
        assert!(tree.verify_partition());
        assert_eq!((tree.units[0].start_line, tree.units[0].end_line), (1, 1));
        assert_eq!((tree.units[1].start_line, tree.units[1].end_line), (2, 2));
    }

    #[test]
    fn normalization_drops_swallowed_units() {
        let source = "x\ny\n";
        let tree = StructuralTree::new(
            Language::Rust,
            source,
            vec![unit(UnitKind::Function, 1, 2), unit(UnitKind::Import, 2, 2)],
        );
        assert_eq!(tree.units.len(), 1);
        assert!(tree.verify_partition());
    }

    #[test]
    fn empty_source_has_no_units() {
        let tree = StructuralTree::new(Language::Python, "", vec![]);
        assert_eq!(tree.total_lines, 0);
        assert!(tree.units.is_empty());
        assert!(tree.verify_partition());
    }

    #[test]
    fn lines_text_is_inclusive() {
        let tree = StructuralTree::new(Language::Rust, "one\ntwo\nthree\n", vec![]);
        assert_eq!(tree.lines_text(2, 3), "two\nthree");
        assert_eq!(tree.lines_text(1, 1), "one");
    }

    #[test]
    fn render_prepends_imports() {
        let source = "use std::fmt;\n\nfn a() {}\n\nfn b() {}\n";
        let tree = StructuralTree::new(
            Language::Rust,
            source,
            vec![
                unit(UnitKind::Import, 1, 1),
                unit(UnitKind::Function, 3, 3),
                unit(UnitKind::Function, 5, 5),
            ],
        );
        // Unit ids after normalization: 0 import, 1 gap, 2 fn a, 3 gap, 4 fn b
        let component = ComponentSpec {
            file_name: "part.rs".into(),
            unit_ids: vec![4],
            import_ids: vec![0],
            line_count: 2,
            oversized: false,
            path: None,
        };
        assert_eq!(component.render(&tree), "use std::fmt;\n\nfn b() {}\n");
    }

    #[test]
    fn strategy_preference_order() {
        assert!(StrategyKind::FunctionBased < StrategyKind::ClassBased);
        assert!(StrategyKind::ClassBased < StrategyKind::SectionBased);
        assert!(StrategyKind::SectionBased < StrategyKind::ModuleBased);
    }

    #[test]
    fn strategy_tags_are_kebab_case() {
        assert_eq!(StrategyKind::FunctionBased.tag(), "function-based");
        assert_eq!(
            serde_json::to_string(&StrategyKind::ModuleBased).unwrap(),
            "\"module-based\""
        );
        assert_eq!(
            serde_json::to_string(&RationaleSource::LearnedBias).unwrap(),
            "\"learned-bias\""
        );
    }
}
