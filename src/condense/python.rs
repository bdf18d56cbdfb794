//! Python capability record.
//!
//! Docstrings are matched as comments so the comment policy governs them;
//! they are never treated as string literals. Names with a leading
//! underscore are private unless they are dunder names.

use tree_sitter::Node;

use super::placeholder::PlaceholderSpec;
use super::query::{CaptureRule, NodePattern, QueryTable};
use super::reducers::comments::DOCSTRING;
use super::reducers::literals::{COLLECTION, STRING};
use super::tree::child_of_kind;
use super::{never_doc, BodyStyle, LanguageSpec, Locality, ScopeInfo, ScopeRules, Visibility};

// ============ Queries ============

const FUNCTIONS: &[NodePattern] = &[NodePattern::new("function", &["function_definition"])
    .with_captures(&[CaptureRule::field("name", "name"), CaptureRule::field("body", "body")])];

const IMPORTS: &[NodePattern] = &[
    NodePattern::new("import", &["import_from_statement"])
        .with_captures(&[CaptureRule::field("path", "module_name")]),
    NodePattern::new("import", &["import_statement"]).with_captures(&[CaptureRule::field("path", "name")]),
    NodePattern::new("import", &["future_import_statement"]),
];

const COMMENTS: &[NodePattern] = &[
    NodePattern::new(DOCSTRING, &["expression_statement"]).with_predicate(is_docstring),
    NodePattern::new("comment", &["comment"]),
];

const LITERALS: &[NodePattern] = &[
    NodePattern::new(STRING, &["string"]).with_predicate(is_plain_string),
    NodePattern::new(COLLECTION, &["list", "dictionary", "set", "tuple"]),
];

pub static SPEC: LanguageSpec = LanguageSpec {
    placeholder: PlaceholderSpec::HASH,
    queries: QueryTable {
        functions: FUNCTIONS,
        imports: IMPORTS,
        comments: COMMENTS,
        literals: LITERALS,
    },
    comment_kinds: &["comment"],
    body_kinds: &["block"],
    body_style: BodyStyle::Indented,
    is_doc_comment: never_doc,
    import_locality,
    scope: Some(ScopeRules {
        wrappers: &[("decorated_definition", "definition")],
        containers: &[("class_definition", "body")],
        attached: &[],
        members: None,
        classify,
        unit_label,
        exports: None,
    }),
};

// ============ Predicates ============

/// A bare string statement opening a module, class or function body.
pub fn is_docstring(node: Node<'_>, _source: &[u8]) -> bool {
    if node.named_child_count() != 1 || node.named_child(0).map(|c| c.kind()) != Some("string") {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    let opens_body = match parent.kind() {
        "module" => true,
        "block" => parent
            .parent()
            .is_some_and(|owner| matches!(owner.kind(), "function_definition" | "class_definition")),
        _ => false,
    };
    if !opens_body {
        return false;
    }
    let mut prev = node.prev_named_sibling();
    while let Some(sibling) = prev {
        if sibling.kind() != "comment" {
            return false;
        }
        prev = sibling.prev_named_sibling();
    }
    true
}

/// String literals that are neither docstrings nor f-strings with
/// interpolations.
fn is_plain_string(node: Node<'_>, source: &[u8]) -> bool {
    if child_of_kind(node, &["interpolation"]).is_some() {
        return false;
    }
    !node
        .parent()
        .is_some_and(|parent| parent.kind() == "expression_statement" && is_docstring(parent, source))
}

fn import_locality(path: &str) -> Locality {
    if path.trim_start().starts_with('.') {
        Locality::Local
    } else {
        Locality::External
    }
}

// ============ Public API ============

fn is_private_name(name: &str) -> bool {
    name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
}

fn classify(node: Node<'_>, source: &str, _info: &ScopeInfo<'_>) -> Visibility {
    let node = if node.kind() == "decorated_definition" {
        match node.child_by_field_name("definition") {
            Some(inner) => inner,
            None => return Visibility::NotADeclaration,
        }
    } else {
        node
    };

    let name = match node.kind() {
        "function_definition" | "class_definition" => node.child_by_field_name("name"),
        "expression_statement" => node
            .named_child(0)
            .filter(|child| child.kind() == "assignment")
            .and_then(|assignment| assignment.child_by_field_name("left"))
            .filter(|left| left.kind() == "identifier"),
        _ => None,
    };
    match name {
        Some(name) if is_private_name(&source[name.byte_range()]) => Visibility::Private,
        Some(_) => Visibility::Public,
        None => Visibility::NotADeclaration,
    }
}

fn unit_label(kind: &str, member: bool) -> &'static str {
    match kind {
        "function_definition" if member => "method",
        "function_definition" => "function",
        "class_definition" => "class",
        "expression_statement" if member => "attribute",
        "expression_statement" => "variable",
        _ => "declaration",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::query::{run, QueryName};
    use crate::condense::tree::parse;
    use crate::condense::LanguageId;

    fn tags(src: &str, query: QueryName) -> Vec<&'static str> {
        let tree = parse(src, LanguageId::Python).unwrap();
        run(SPEC.queries.patterns(query), tree.root(), src.as_bytes())
            .iter()
            .map(|c| c.tag())
            .collect()
    }

    #[test]
    fn test_docstrings_are_comments_not_literals() {
        let src = "\"\"\"Module.\"\"\"\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    x = \"value\"\n    \"not a docstring\"\n";
        assert_eq!(tags(src, QueryName::Comments), vec![DOCSTRING, DOCSTRING]);
        assert_eq!(tags(src, QueryName::Literals), vec![STRING, STRING]);
    }

    #[test]
    fn test_fstrings_with_interpolation_skipped() {
        let src = "a = f\"{x} y\"\nb = f\"plain\"\n";
        assert_eq!(tags(src, QueryName::Literals), vec![STRING]);
    }

    #[test]
    fn test_private_names() {
        assert!(is_private_name("_helper"));
        assert!(!is_private_name("__init__"));
        assert!(is_private_name("__mangled"));
        assert!(!is_private_name("public"));
    }

    #[test]
    fn test_import_locality() {
        assert_eq!(import_locality(".models"), Locality::Local);
        assert_eq!(import_locality("os.path"), Locality::External);
    }
}
