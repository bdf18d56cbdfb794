//! TypeScript / JavaScript capability record.
//!
//! Shared by .ts, .tsx, .js and .jsx files. In a module with exports,
//! top-level declarations are private unless exported, either directly or
//! by name through `export { .. }` or `export default name`. A script without any
//! `export` keeps every top-level declaration. Class members are private
//! when marked `private`/`protected` or named with `#`.

use tree_sitter::Node;

use super::placeholder::PlaceholderSpec;
use super::query::{CaptureRule, NodePattern, QueryTable};
use super::reducers::literals::{COLLECTION, STRING};
use super::tree::{child_of_kind, named_children};
use super::{BodyStyle, LanguageSpec, Locality, ModuleExports, ScopeInfo, ScopeRules, Visibility};

// ============ Queries ============

const BODY: &[CaptureRule] = &[CaptureRule::field("name", "name"), CaptureRule::field("body", "body")];

const FUNCTIONS: &[NodePattern] = &[NodePattern::new(
    "function",
    &[
        "function_declaration",
        "generator_function_declaration",
        "function_expression",
        "generator_function",
        "method_definition",
        "arrow_function",
    ],
)
.with_captures(BODY)];

const IMPORTS: &[NodePattern] =
    &[NodePattern::new("import", &["import_statement"]).with_captures(&[CaptureRule::field("path", "source")])];

const COMMENTS: &[NodePattern] = &[NodePattern::new("comment", &["comment"])];

const LITERALS: &[NodePattern] = &[
    NodePattern::new(STRING, &["string"]),
    NodePattern::new(STRING, &["template_string"]).with_predicate(is_plain_template),
    NodePattern::new(COLLECTION, &["array", "object"]),
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
    body_kinds: &["statement_block"],
    body_style: BodyStyle::Braces,
    is_doc_comment,
    import_locality,
    scope: Some(ScopeRules {
        wrappers: &[("export_statement", "declaration")],
        containers: &[("class_declaration", "body"), ("abstract_class_declaration", "body")],
        attached: &["decorator"],
        members: None,
        classify,
        unit_label,
        exports: Some(exports),
    }),
};

// ============ Capabilities ============

fn is_plain_template(node: Node<'_>, _source: &[u8]) -> bool {
    child_of_kind(node, &["template_substitution"]).is_none()
}

fn is_doc_comment(node: Node<'_>, source: &str) -> bool {
    let text = &source[node.byte_range()];
    text.starts_with("/**") && !text.starts_with("/**/")
}

fn import_locality(path: &str) -> Locality {
    let bare = path.trim().trim_matches(['"', '\'', '`']);
    if bare.starts_with('.') || bare.starts_with('/') {
        Locality::Local
    } else {
        Locality::External
    }
}

fn exports(root: Node<'_>, source: &str) -> ModuleExports {
    let mut exports = ModuleExports::default();
    for statement in named_children(root) {
        if statement.kind() != "export_statement" {
            continue;
        }
        exports.any = true;
        // `export { a } from './m'` re-exports another module's bindings.
        if statement.child_by_field_name("source").is_some() {
            continue;
        }
        if let Some(clause) = child_of_kind(statement, &["export_clause"]) {
            let names = named_children(clause)
                .into_iter()
                .filter(|spec| spec.kind() == "export_specifier")
                .filter_map(|spec| spec.child_by_field_name("name"));
            exports.names.extend(names.map(|name| source[name.byte_range()].to_string()));
        } else if let Some(value) = statement.child_by_field_name("value").filter(|v| v.kind() == "identifier") {
            exports.names.push(source[value.byte_range()].to_string());
        }
    }
    exports
}

// ============ Public API ============

const TOP_LEVEL: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "class_declaration",
    "abstract_class_declaration",
    "lexical_declaration",
    "variable_declaration",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "internal_module",
    "module",
    "ambient_declaration",
    "function_signature",
];

const MEMBERS: &[&str] = &[
    "method_definition",
    "method_signature",
    "abstract_method_signature",
    "public_field_definition",
    "field_definition",
];

fn classify(node: Node<'_>, source: &str, info: &ScopeInfo<'_>) -> Visibility {
    let kind = node.kind();
    if info.container.is_some() {
        if !MEMBERS.contains(&kind) {
            return Visibility::NotADeclaration;
        }
        let restricted = child_of_kind(node, &["accessibility_modifier"])
            .is_some_and(|m| matches!(source[m.byte_range()].trim(), "private" | "protected"));
        let hash_named = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))
            .is_some_and(|name| name.kind() == "private_property_identifier");
        return if restricted || hash_named {
            Visibility::Private
        } else {
            Visibility::Public
        };
    }

    if kind == "export_statement" {
        Visibility::Public
    } else if !TOP_LEVEL.contains(&kind) {
        Visibility::NotADeclaration
    } else if !info.file_has_exports || exported_by_name(node, source, info.exported) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn exported_by_name(node: Node<'_>, source: &str, exported: &[String]) -> bool {
    let name_nodes = match node.kind() {
        "lexical_declaration" | "variable_declaration" => named_children(node)
            .into_iter()
            .filter(|d| d.kind() == "variable_declarator")
            .filter_map(|d| d.child_by_field_name("name"))
            .collect(),
        _ => node.child_by_field_name("name").into_iter().collect::<Vec<_>>(),
    };
    name_nodes
        .into_iter()
        .any(|name| exported.iter().any(|e| *e == source[name.byte_range()]))
}

fn unit_label(kind: &str, _member: bool) -> &'static str {
    match kind {
        "function_declaration" | "generator_function_declaration" | "function_signature" => "function",
        "class_declaration" | "abstract_class_declaration" => "class",
        "lexical_declaration" | "variable_declaration" => "variable",
        "interface_declaration" => "interface",
        "type_alias_declaration" => "type",
        "enum_declaration" => "enum",
        "internal_module" | "module" => "namespace",
        "method_definition" | "method_signature" | "abstract_method_signature" => "method",
        "public_field_definition" | "field_definition" => "field",
        _ => "declaration",
    }
}
