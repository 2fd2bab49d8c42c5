//! Rust structural analyzer built on syn, with proc-macro2 span locations
//! supplying real line numbers.

use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{Expr, ImplItem, Item, TraitItem, UseTree};

use crate::analyzers::Analyzer;
use crate::core::{Language, SourceUnit, StructuralTree, UnitKind};
use crate::errors::{Result, SplitError};

pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for RustAnalyzer {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn analyze(&self, source: &str) -> Result<StructuralTree> {
        let file = parse_source(source)?;
        let units = file.items.iter().map(unit_for_item).collect();
        Ok(StructuralTree::new(Language::Rust, source, units))
    }

    fn check_syntax(&self, source: &str) -> Result<()> {
        parse_source(source).map(|_| ())
    }
}

fn parse_source(source: &str) -> Result<syn::File> {
    syn::parse_file(source).map_err(|e| {
        let start = e.span().start();
        SplitError::parse(start.line, start.column, e.to_string())
    })
}

fn line_range(span: proc_macro2::Span) -> (usize, usize) {
    let start = span.start().line.max(1);
    let end = span.end().line.max(start);
    (start, end)
}

fn unit_for_item(item: &Item) -> SourceUnit {
    let (start, end) = line_range(item.span());
    match item {
        Item::Use(item_use) => {
            SourceUnit::new(UnitKind::Import, None, start, end)
                .with_bindings(use_bindings(&item_use.tree))
        }
        Item::ExternCrate(item_crate) => SourceUnit::new(
            UnitKind::Import,
            Some(item_crate.ident.to_string()),
            start,
            end,
        )
        .with_bindings(vec![item_crate.ident.to_string()]),
        Item::Fn(item_fn) => SourceUnit::new(
            UnitKind::Function,
            Some(item_fn.sig.ident.to_string()),
            start,
            end,
        )
        .with_complexity(block_complexity(&item_fn.block)),
        Item::Struct(s) => {
            SourceUnit::new(UnitKind::Class, Some(s.ident.to_string()), start, end)
        }
        Item::Enum(e) => SourceUnit::new(UnitKind::Class, Some(e.ident.to_string()), start, end),
        Item::Union(u) => SourceUnit::new(UnitKind::Class, Some(u.ident.to_string()), start, end),
        Item::Trait(t) => {
            let members = trait_methods(t);
            let complexity = members.iter().map(|m| m.complexity).sum();
            SourceUnit::new(UnitKind::Class, Some(t.ident.to_string()), start, end)
                .with_members(members)
                .with_complexity(complexity)
        }
        Item::Impl(item_impl) => {
            let members = impl_methods(item_impl);
            let complexity = members.iter().map(|m| m.complexity).sum();
            SourceUnit::new(UnitKind::Class, impl_type_name(item_impl), start, end)
                .with_members(members)
                .with_complexity(complexity)
        }
        Item::Const(c) => SourceUnit::new(UnitKind::Section, Some(c.ident.to_string()), start, end),
        Item::Static(s) => {
            SourceUnit::new(UnitKind::Section, Some(s.ident.to_string()), start, end)
        }
        Item::Type(t) => SourceUnit::new(UnitKind::Section, Some(t.ident.to_string()), start, end),
        Item::Mod(m) => SourceUnit::new(UnitKind::Section, Some(m.ident.to_string()), start, end),
        Item::Macro(m) => SourceUnit::new(
            UnitKind::Section,
            m.ident.as_ref().map(|i| i.to_string()),
            start,
            end,
        ),
        _ => SourceUnit::new(UnitKind::Section, None, start, end),
    }
}

fn impl_type_name(item_impl: &syn::ItemImpl) -> Option<String> {
    if let syn::Type::Path(type_path) = item_impl.self_ty.as_ref() {
        type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
    } else {
        None
    }
}

fn impl_methods(item_impl: &syn::ItemImpl) -> Vec<SourceUnit> {
    item_impl
        .items
        .iter()
        .filter_map(|item| match item {
            ImplItem::Fn(method) => {
                let (start, end) = line_range(method.span());
                Some(
                    SourceUnit::new(
                        UnitKind::Method,
                        Some(method.sig.ident.to_string()),
                        start,
                        end,
                    )
                    .with_complexity(block_complexity(&method.block)),
                )
            }
            _ => None,
        })
        .collect()
}

fn trait_methods(item_trait: &syn::ItemTrait) -> Vec<SourceUnit> {
    item_trait
        .items
        .iter()
        .filter_map(|item| match item {
            TraitItem::Fn(method) => {
                let (start, end) = line_range(method.span());
                let complexity = method
                    .default
                    .as_ref()
                    .map(block_complexity)
                    .unwrap_or(0);
                Some(
                    SourceUnit::new(
                        UnitKind::Method,
                        Some(method.sig.ident.to_string()),
                        start,
                        end,
                    )
                    .with_complexity(complexity),
                )
            }
            _ => None,
        })
        .collect()
}

/// Names a `use` tree brings into scope. Globs bind nothing, which marks the
/// import as un-provably-unused downstream.
fn use_bindings(tree: &UseTree) -> Vec<String> {
    match tree {
        UseTree::Path(path) => use_bindings(&path.tree),
        UseTree::Name(name) => vec![name.ident.to_string()],
        UseTree::Rename(rename) => vec![rename.rename.to_string()],
        UseTree::Glob(_) => Vec::new(),
        UseTree::Group(group) => group.items.iter().flat_map(use_bindings).collect(),
    }
}

/// Complexity proxy: conditional/loop/exception node count plus the maximum
/// nesting depth reached inside the block.
pub(crate) fn block_complexity(block: &syn::Block) -> u32 {
    let mut visitor = ComplexityVisitor {
        branches: 0,
        depth: 0,
        max_depth: 0,
    };
    visitor.visit_block(block);
    visitor.branches + visitor.max_depth
}

struct ComplexityVisitor {
    branches: u32,
    depth: u32,
    max_depth: u32,
}

impl<'ast> Visit<'ast> for ComplexityVisitor {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::If(_) | Expr::While(_) | Expr::ForLoop(_) | Expr::Loop(_) => self.branches += 1,
            Expr::Match(expr_match) => self.branches += expr_match.arms.len() as u32,
            Expr::Try(_) => self.branches += 1,
            _ => {}
        }
        let nests = matches!(
            expr,
            Expr::If(_) | Expr::While(_) | Expr::ForLoop(_) | Expr::Loop(_) | Expr::Match(_)
        );
        if nests {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
            syn::visit::visit_expr(self, expr);
            self.depth -= 1;
        } else {
            syn::visit::visit_expr(self, expr);
        }
    }
}
