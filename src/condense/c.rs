//! C capability record.
//!
//! `#include "..."` is local and `#include <...>` external. File-scope
//! declarations marked `static` are private; everything else is part of
//! the public interface.

use tree_sitter::Node;

use super::common::is_c_style_doc;
use super::placeholder::PlaceholderSpec;
use super::query::{CaptureRule, NodePattern, QueryTable};
use super::reducers::literals::{COLLECTION, STRING};
use super::tree::named_children;
use super::{BodyStyle, LanguageSpec, Locality, ScopeInfo, ScopeRules, Visibility};

// ============ Queries ============

const FUNCTIONS: &[NodePattern] = &[NodePattern::new("function", &["function_definition"])
    .with_captures(&[CaptureRule::field("declarator", "declarator"), CaptureRule::field("body", "body")])];

const IMPORTS: &[NodePattern] =
    &[NodePattern::new("include", &["preproc_include"]).with_captures(&[CaptureRule::field("path", "path")])];

const COMMENTS: &[NodePattern] = &[NodePattern::new("comment", &["comment"])];

const LITERALS: &[NodePattern] = &[
    NodePattern::new(STRING, &["string_literal"]),
    NodePattern::new(COLLECTION, &["initializer_list"]),
];

pub static SPEC: LanguageSpec = LanguageSpec {
    placeholder: PlaceholderSpec::C_STYLE,
    queries: QueryTable {
        functions: FUNCTIONS,
        imports: IMPORTS,
        comments: COMMENTS,
        literals: LITERALS,
    },
    comment_kinds: &["comment"],
    body_kinds: &["compound_statement"],
    body_style: BodyStyle::Braces,
    is_doc_comment,
    import_locality,
    scope: Some(ScopeRules {
        wrappers: &[],
        containers: &[],
        attached: &[],
        members: None,
        classify,
        unit_label,
        exports: None,
    }),
};

// ============ Capabilities ============

fn is_doc_comment(node: Node<'_>, source: &str) -> bool {
    is_c_style_doc(&source[node.byte_range()])
}

fn import_locality(path: &str) -> Locality {
    if path.trim_start().starts_with('"') {
        Locality::Local
    } else {
        Locality::External
    }
}

const DECLARATIONS: &[&str] = &[
    "function_definition",
    "declaration",
    "type_definition",
    "struct_specifier",
    "enum_specifier",
    "union_specifier",
];

fn classify(node: Node<'_>, source: &str, _info: &ScopeInfo<'_>) -> Visibility {
    if !DECLARATIONS.contains(&node.kind()) {
        return Visibility::NotADeclaration;
    }
    let is_static = named_children(node)
        .iter()
        .any(|child| child.kind() == "storage_class_specifier" && source[child.byte_range()].trim() == "static");
    if is_static {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn unit_label(kind: &str, _member: bool) -> &'static str {
    match kind {
        "function_definition" => "function",
        "type_definition" => "typedef",
        "struct_specifier" => "struct",
        "enum_specifier" => "enum",
        "union_specifier" => "union",
        _ => "declaration",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::tree::parse;
    use crate::condense::LanguageId;

    #[test]
    fn test_static_is_private() {
        let src = "#include <stdio.h>\nstatic int counter;\nint shared;\nstatic void helper(void) {}\n";
        let tree = parse(src, LanguageId::C).unwrap();
        let info = ScopeInfo {
            container: None,
            file_has_exports: true,
            exported: &[],
        };
        let vis: Vec<Visibility> = named_children(tree.root())
            .into_iter()
            .map(|n| classify(n, src, &info))
            .collect();
        assert_eq!(
            vis,
            vec![
                Visibility::NotADeclaration,
                Visibility::Private,
                Visibility::Public,
                Visibility::Private,
            ]
        );
    }

    #[test]
    fn test_include_locality() {
        assert_eq!(import_locality("\"local.h\""), Locality::Local);
        assert_eq!(import_locality("<stdio.h>"), Locality::External);
    }
}
