//! Read-only view over a parsed syntax tree.
//!
//! The tree is produced once per file and never mutated; every fitter level
//! walks the same nodes and computes its edits against the original offsets.

use tree_sitter::{Node, Parser, Tree};

use super::common::{has_blank_line_between, trimmed_end};
use super::LanguageId;
use crate::error::ReduceError;

/// A parsed source file.
#[derive(Debug)]
pub struct SyntaxTree {
    tree: Tree,
    language: LanguageId,
}

impl SyntaxTree {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    /// Total byte length covered by the root node.
    pub fn len(&self) -> usize {
        self.root().end_byte()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse `source` with the grammar for `language`.
///
/// Trees containing syntax errors are rejected: edits computed over error
/// nodes cannot be trusted to keep unrelated text intact.
pub fn parse(source: &str, language: LanguageId) -> Result<SyntaxTree, ReduceError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| ReduceError::parse(language, format!("failed to set language: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ReduceError::parse(language, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).map_or(0, |n| n.start_position().row + 1);
        return Err(ReduceError::parse(language, format!("syntax error near line {at}")));
    }

    Ok(SyntaxTree { tree, language })
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

// ============ Navigation ============

/// Named children of `node`, in source order.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// First direct child whose kind is one of `kinds`.
pub fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| kinds.contains(&c.kind()));
    found
}

/// True if `inner` lies within `outer`.
pub fn span_contains(outer: (usize, usize), inner: (usize, usize)) -> bool {
    outer.0 <= inner.0 && inner.1 <= outer.1
}

/// True if some span in `spans` contains `inner`.
pub fn within_any(spans: &[(usize, usize)], inner: (usize, usize)) -> bool {
    spans.iter().any(|&outer| span_contains(outer, inner))
}

/// Siblings before `node` of the given kinds that are directly attached to
/// it: no blank line separates them from each other or from `node`.
pub fn attached_before<'t>(node: Node<'t>, source: &str, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut attached = Vec::new();
    let mut boundary = node.start_byte();
    let mut current = node.prev_named_sibling();
    while let Some(prev) = current {
        if !kinds.contains(&prev.kind()) || has_blank_line_between(source, trimmed_end(prev, source), boundary) {
            break;
        }
        boundary = prev.start_byte();
        attached.push(prev);
        current = prev.prev_named_sibling();
    }
    attached.reverse();
    attached
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rust() {
        let tree = parse("fn main() {}\n", LanguageId::Rust).unwrap();
        assert_eq!(tree.root().kind(), "source_file");
        assert_eq!(tree.language(), LanguageId::Rust);
        assert_eq!(tree.len(), 13);
    }

    #[test]
    fn test_parse_rejects_syntax_errors() {
        let err = parse("fn main( {\n", LanguageId::Rust).unwrap_err();
        assert!(matches!(err, ReduceError::Parse { language: LanguageId::Rust, .. }));
    }

    #[test]
    fn test_attached_before() {
        let src = "// a\n\n// b\n#[derive(Debug)]\nstruct S;\n";
        let tree = parse(src, LanguageId::Rust).unwrap();
        let item = named_children(tree.root())
            .into_iter()
            .find(|n| n.kind() == "struct_item")
            .unwrap();
        let attached = attached_before(item, src, &["line_comment", "attribute_item"]);
        let kinds: Vec<_> = attached.iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["line_comment", "attribute_item"]);
        assert_eq!(attached[0].start_byte(), src.find("// b").unwrap());
    }
}
