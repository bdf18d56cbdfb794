//! Rust capability record.
//!
//! Handles Rust files (.rs):
//! - `///` / `//!` / `/** */` doc comments
//! - `use` declarations, local when rooted at `crate`, `self` or `super`
//! - Function items and closures with block bodies
//! - `pub` visibility; `pub(crate)` and narrower count as private

use tree_sitter::Node;

use super::common::is_c_style_doc;
use super::placeholder::PlaceholderSpec;
use super::query::{CaptureRule, NodePattern, QueryTable};
use super::reducers::literals::{COLLECTION, STRING};
use super::tree::{attached_before, child_of_kind};
use super::{BodyStyle, LanguageSpec, Locality, ScopeInfo, ScopeRules, Visibility};

// ============ Queries ============

const BODY: &[CaptureRule] = &[CaptureRule::field("name", "name"), CaptureRule::field("body", "body")];

const FUNCTIONS: &[NodePattern] = &[
    NodePattern::new("function", &["function_item"]).with_captures(BODY),
    NodePattern::new("closure", &["closure_expression"]).with_captures(BODY),
];

const IMPORTS: &[NodePattern] =
    &[NodePattern::new("use", &["use_declaration"]).with_captures(&[CaptureRule::field("path", "argument")])];

const COMMENTS: &[NodePattern] = &[NodePattern::new("comment", &["line_comment", "block_comment"])];

const LITERALS: &[NodePattern] = &[
    NodePattern::new(STRING, &["string_literal", "raw_string_literal"]),
    NodePattern::new(COLLECTION, &["array_expression"]),
];

pub static SPEC: LanguageSpec = LanguageSpec {
    placeholder: PlaceholderSpec::C_STYLE,
    queries: QueryTable {
        functions: FUNCTIONS,
        imports: IMPORTS,
        comments: COMMENTS,
        literals: LITERALS,
    },
    comment_kinds: &["line_comment", "block_comment"],
    body_kinds: &["block"],
    body_style: BodyStyle::Braces,
    is_doc_comment,
    import_locality,
    scope: Some(ScopeRules {
        wrappers: &[],
        containers: &[
            ("impl_item", "body"),
            ("trait_item", "body"),
            ("mod_item", "body"),
            ("struct_item", "body"),
        ],
        attached: &["attribute_item"],
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
    let root = path.trim_start_matches("::");
    if ["crate", "self", "super"]
        .iter()
        .any(|head| root == *head || root.starts_with(&format!("{head}::")))
    {
        Locality::Local
    } else {
        Locality::External
    }
}

const DECLARATIONS: &[&str] = &[
    "function_item",
    "function_signature_item",
    "struct_item",
    "enum_item",
    "union_item",
    "type_item",
    "const_item",
    "static_item",
    "trait_item",
    "impl_item",
    "mod_item",
    "macro_definition",
    "field_declaration",
    "associated_type",
];

fn classify(node: Node<'_>, source: &str, info: &ScopeInfo<'_>) -> Visibility {
    let kind = node.kind();
    if !DECLARATIONS.contains(&kind) {
        return Visibility::NotADeclaration;
    }

    // Trait items and trait impl members inherit the trait's visibility.
    if let Some(container) = info.container {
        if container.kind() == "trait_item"
            || (container.kind() == "impl_item" && container.child_by_field_name("trait").is_some())
        {
            return Visibility::Public;
        }
    }

    match kind {
        "impl_item" => Visibility::Public,
        "macro_definition" => {
            let exported = attached_before(node, source, &["attribute_item"])
                .iter()
                .any(|attr| source[attr.byte_range()].contains("macro_export"));
            if exported {
                Visibility::Public
            } else {
                Visibility::Private
            }
        }
        _ => match child_of_kind(node, &["visibility_modifier"]) {
            Some(vis) if source[vis.byte_range()].trim() == "pub" => Visibility::Public,
            _ => Visibility::Private,
        },
    }
}

fn unit_label(kind: &str, member: bool) -> &'static str {
    match kind {
        "function_item" | "function_signature_item" if member => "method",
        "function_item" | "function_signature_item" => "function",
        "struct_item" => "struct",
        "enum_item" => "enum",
        "union_item" => "union",
        "type_item" | "associated_type" => "type alias",
        "const_item" => "constant",
        "static_item" => "static",
        "trait_item" => "trait",
        "impl_item" => "impl block",
        "mod_item" => "module",
        "macro_definition" => "macro",
        "field_declaration" => "field",
        _ => "item",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::tree::{named_children, parse};
    use crate::condense::LanguageId;

    fn classify_top(src: &str) -> Vec<Visibility> {
        let tree = parse(src, LanguageId::Rust).unwrap();
        let info = ScopeInfo {
            container: None,
            file_has_exports: true,
            exported: &[],
        };
        named_children(tree.root())
            .into_iter()
            .map(|node| classify(node, src, &info))
            .collect()
    }

    #[test]
    fn test_visibility_modifiers() {
        let src = "pub fn a() {}\npub(crate) fn b() {}\nfn c() {}\nimpl X {}\nuse std::io;\n";
        assert_eq!(
            classify_top(src),
            vec![
                Visibility::Public,
                Visibility::Private,
                Visibility::Private,
                Visibility::Public,
                Visibility::NotADeclaration,
            ]
        );
    }

    #[test]
    fn test_exported_macro() {
        let src = "#[macro_export]\nmacro_rules! m { () => {} }\nmacro_rules! n { () => {} }\n";
        let vis = classify_top(src);
        assert_eq!(vis[1], Visibility::Public);
        assert_eq!(vis[2], Visibility::Private);
    }

    #[test]
    fn test_import_locality() {
        assert_eq!(import_locality("crate::edit::Edit"), Locality::Local);
        assert_eq!(import_locality("super::common"), Locality::Local);
        assert_eq!(import_locality("self"), Locality::Local);
        assert_eq!(import_locality("std::fmt"), Locality::External);
        assert_eq!(import_locality("crates_io::x"), Locality::External);
    }
}
