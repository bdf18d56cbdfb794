//! Go capability record.
//!
//! Exported identifiers start with an upper-case letter, struct fields
//! included. Doc comments are the comment lines directly above a top-level
//! declaration.

use tree_sitter::Node;

use super::common::has_blank_line_between;
use super::placeholder::PlaceholderSpec;
use super::query::{CaptureRule, NodePattern, QueryTable};
use super::reducers::literals::{COLLECTION, STRING};
use super::tree::{child_of_kind, named_children};
use super::{BodyStyle, LanguageSpec, Locality, ScopeInfo, ScopeRules, Visibility};

// ============ Queries ============

const FUNCTIONS: &[NodePattern] = &[NodePattern::new(
    "function",
    &["function_declaration", "method_declaration", "func_literal"],
)
.with_captures(&[CaptureRule::field("name", "name"), CaptureRule::field("body", "body")])];

const IMPORTS: &[NodePattern] =
    &[NodePattern::new("import", &["import_spec"]).with_captures(&[CaptureRule::field("path", "path")])];

const COMMENTS: &[NodePattern] = &[NodePattern::new("comment", &["comment"])];

const LITERALS: &[NodePattern] = &[
    NodePattern::new(STRING, &["interpreted_string_literal", "raw_string_literal"]),
    NodePattern::new(COLLECTION, &["literal_value"]),
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
    body_kinds: &["block"],
    body_style: BodyStyle::Braces,
    is_doc_comment,
    import_locality,
    scope: Some(ScopeRules {
        wrappers: &[],
        containers: &[],
        attached: &[],
        members: Some(struct_fields),
        classify,
        unit_label,
        exports: None,
    }),
};

// ============ Capabilities ============

const DECLARATIONS: &[&str] = &[
    "function_declaration",
    "method_declaration",
    "type_declaration",
    "const_declaration",
    "var_declaration",
    "package_clause",
];

/// A comment run ending directly above a declaration.
fn is_doc_comment(node: Node<'_>, source: &str) -> bool {
    let mut current = node;
    while let Some(next) = current.next_named_sibling() {
        if has_blank_line_between(source, current.end_byte(), next.start_byte())
            || next.start_position().row == current.end_position().row
        {
            return false;
        }
        if next.kind() != "comment" {
            return DECLARATIONS.contains(&next.kind());
        }
        current = next;
    }
    false
}

fn import_locality(path: &str) -> Locality {
    let bare = path.trim().trim_matches(['"', '`']);
    if bare.starts_with("./") || bare.starts_with("../") {
        Locality::Local
    } else {
        Locality::External
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Names declared by a `type`, `const` or `var` declaration.
fn spec_names<'s>(node: Node<'_>, source: &'s str) -> Vec<&'s str> {
    let mut specs = named_children(node);
    // Grouped declarations nest their specs in a list node.
    if let Some(list) = specs.iter().find(|s| s.kind().ends_with("_spec_list")).copied() {
        specs = named_children(list);
    }
    specs
        .into_iter()
        .filter_map(|spec| spec.child_by_field_name("name"))
        .map(|name| &source[name.byte_range()])
        .collect()
}

/// Field list of a `type Name struct { .. }` declaration.
fn struct_fields(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() != "type_declaration" {
        return None;
    }
    let specs: Vec<Node<'_>> = named_children(node)
        .into_iter()
        .filter(|spec| spec.kind() == "type_spec")
        .collect();
    let [spec] = specs.as_slice() else {
        return None;
    };
    let ty = spec.child_by_field_name("type").filter(|ty| ty.kind() == "struct_type")?;
    child_of_kind(ty, &["field_declaration_list"])
}

/// Names of a struct field; an embedded field goes by its type name.
fn field_names<'s>(node: Node<'_>, source: &'s str) -> Vec<&'s str> {
    let mut cursor = node.walk();
    let names: Vec<&str> = node
        .children_by_field_name("name", &mut cursor)
        .map(|name| &source[name.byte_range()])
        .collect();
    if !names.is_empty() {
        return names;
    }
    node.child_by_field_name("type")
        .map(|ty| {
            let text = source[ty.byte_range()].trim_start_matches('*');
            let base = text.split('[').next().unwrap_or(text);
            vec![base.rsplit('.').next().unwrap_or(base)]
        })
        .unwrap_or_default()
}

fn classify(node: Node<'_>, source: &str, info: &ScopeInfo<'_>) -> Visibility {
    if info.container.is_some() {
        if node.kind() != "field_declaration" {
            return Visibility::NotADeclaration;
        }
        return if field_names(node, source).iter().any(|name| is_exported(name)) {
            Visibility::Public
        } else {
            Visibility::Private
        };
    }
    let names: Vec<&str> = match node.kind() {
        "function_declaration" | "method_declaration" => node
            .child_by_field_name("name")
            .map(|name| vec![&source[name.byte_range()]])
            .unwrap_or_default(),
        "type_declaration" | "const_declaration" | "var_declaration" => spec_names(node, source),
        _ => return Visibility::NotADeclaration,
    };
    if names.is_empty() {
        Visibility::NotADeclaration
    } else if names.iter().any(|name| is_exported(name)) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn unit_label(kind: &str, _member: bool) -> &'static str {
    match kind {
        "function_declaration" => "function",
        "method_declaration" => "method",
        "type_declaration" => "type",
        "const_declaration" => "constant",
        "var_declaration" => "variable",
        "field_declaration" => "field",
        _ => "declaration",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::tree::parse;
    use crate::condense::LanguageId;

    #[test]
    fn test_doc_comment_attachment() {
        let src = "package p\n\n// Run starts.\n// More.\nfunc Run() {}\n\n// floating\n\nvar x = 1\n";
        let tree = parse(src, LanguageId::Go).unwrap();
        let docs: Vec<bool> = named_children(tree.root())
            .into_iter()
            .filter(|n| n.kind() == "comment")
            .map(|n| is_doc_comment(n, src))
            .collect();
        assert_eq!(docs, vec![true, true, false]);
    }

    #[test]
    fn test_grouped_declarations() {
        let src = "package p\n\nconst (\n\ta = 1\n\tB = 2\n)\n\nvar (\n\tc = 1\n)\n";
        let tree = parse(src, LanguageId::Go).unwrap();
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
            vec![Visibility::NotADeclaration, Visibility::Public, Visibility::Private]
        );
    }

    #[test]
    fn test_struct_field_visibility() {
        let src = "package p\n\ntype Config struct {\n\tName, alias string\n\tsecret string\n\t*Base\n\tpkg.inner\n}\n";
        let tree = parse(src, LanguageId::Go).unwrap();
        let decl = tree.root().named_child(1).unwrap();
        let fields = struct_fields(decl).unwrap();
        let info = ScopeInfo {
            container: Some(decl),
            file_has_exports: true,
            exported: &[],
        };
        let vis: Vec<Visibility> = named_children(fields)
            .into_iter()
            .map(|n| classify(n, src, &info))
            .collect();
        assert_eq!(
            vis,
            vec![Visibility::Public, Visibility::Private, Visibility::Public, Visibility::Private]
        );
    }

    #[test]
    fn test_import_locality() {
        assert_eq!(import_locality("\"./internal\""), Locality::Local);
        assert_eq!(import_locality("\"fmt\""), Locality::External);
    }
}
