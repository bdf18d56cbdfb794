//! Public-API filter.
//!
//! Deletes private declarations together with their decorators and directly
//! attached comments. Consecutive private siblings share one marker such as
//! `// … 4 methods omitted (34 lines)`. Public containers (impl blocks,
//! classes, modules) are filtered recursively and always keep their own
//! declaration, even when every member is removed.

use tree_sitter::Node;

use super::{ReduceContext, Reducer};
use crate::condense::common::{
    count_lines, expand_to_lines, has_blank_line_between, indentation_at, only_whitespace_before, trimmed_end,
};
use crate::condense::edit::{Edit, EditBuffer, Pass};
use crate::condense::placeholder::{render, OmissionKind, OmissionRecord, Placement};
use crate::condense::policy::ReductionPolicyConfig;
use crate::condense::tree::named_children;
use crate::condense::{ModuleExports, ScopeInfo, ScopeRules, Visibility};
use crate::error::ReduceError;

pub struct PublicApiReducer;

enum Entry<'t> {
    Unit {
        start: usize,
        end: usize,
        node: Node<'t>,
        visibility: Visibility,
    },
    Neutral,
}

struct Omitted {
    start: usize,
    end: usize,
    label: &'static str,
}

impl Reducer for PublicApiReducer {
    fn pass(&self) -> Pass {
        Pass::PublicApi
    }

    fn is_active(&self, config: &ReductionPolicyConfig) -> bool {
        config.public_api_only
    }

    fn reduce(&self, ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>) -> Result<(), ReduceError> {
        let Some(rules) = ctx.spec.scope.as_ref() else {
            return Ok(());
        };
        let root = ctx.tree.root();
        let exports = match rules.exports {
            Some(collect) => collect(root, ctx.source),
            None => ModuleExports {
                any: true,
                names: Vec::new(),
            },
        };
        let filter = ScopeFilter { ctx, rules, exports };
        filter.walk(root, None, buffer);
        Ok(())
    }
}

struct ScopeFilter<'c, 'a> {
    ctx: &'c ReduceContext<'a>,
    rules: &'c ScopeRules,
    exports: ModuleExports,
}

impl ScopeFilter<'_, '_> {
    fn walk(&self, scope: Node<'_>, container: Option<Node<'_>>, buffer: &mut EditBuffer<'_>) {
        let entries = self.entries(scope, container);

        let mut run: Vec<Omitted> = Vec::new();
        for entry in entries {
            match entry {
                Entry::Unit {
                    start,
                    end,
                    node,
                    visibility: Visibility::Private,
                } => {
                    let inner = self.rules.unwrap(node);
                    run.push(Omitted {
                        start,
                        end,
                        label: (self.rules.unit_label)(inner.kind(), container.is_some()),
                    });
                }
                Entry::Unit { node, .. } => {
                    self.flush(buffer, &mut run);
                    let inner = self.rules.unwrap(node);
                    if let Some(body) = self.rules.container_body(inner) {
                        self.walk(body, Some(inner), buffer);
                    }
                }
                Entry::Neutral => self.flush(buffer, &mut run),
            }
        }
        self.flush(buffer, &mut run);
    }

    /// Group the members of `scope` into declaration units with their
    /// attached comments and decorators.
    fn entries<'t>(&self, scope: Node<'t>, container: Option<Node<'_>>) -> Vec<Entry<'t>> {
        let source = self.ctx.source;
        let info = ScopeInfo {
            container,
            file_has_exports: self.exports.any,
            exported: &self.exports.names,
        };
        let mut entries = Vec::new();
        let mut pending: Vec<Node<'t>> = Vec::new();

        for child in named_children(scope) {
            let attachable = (self.ctx.is_comment(child) || self.rules.attached.contains(&child.kind()))
                && only_whitespace_before(source, child.start_byte());
            let detached = pending
                .last()
                .is_some_and(|last| has_blank_line_between(source, trimmed_end(*last, source), child.start_byte()));
            if detached {
                entries.extend(pending.drain(..).map(|_| Entry::Neutral));
            }
            if attachable {
                pending.push(child);
                continue;
            }

            let visibility = if self.ctx.is_comment(child) {
                Visibility::NotADeclaration
            } else {
                (self.rules.classify)(child, source, &info)
            };
            if visibility == Visibility::NotADeclaration {
                entries.extend(pending.drain(..).map(|_| Entry::Neutral));
                entries.push(Entry::Neutral);
                continue;
            }
            let start = pending.first().map_or(child.start_byte(), |n| n.start_byte());
            pending.clear();
            entries.push(Entry::Unit {
                start,
                end: unit_end(child, source),
                node: child,
                visibility,
            });
        }
        entries.extend(pending.drain(..).map(|_| Entry::Neutral));
        entries
    }

    fn flush(&self, buffer: &mut EditBuffer<'_>, run: &mut Vec<Omitted>) {
        let (Some(first), Some(last)) = (run.first(), run.last()) else {
            return;
        };
        let ctx = self.ctx;
        let (start, end) = (first.start, last.end);
        let label = if run.iter().all(|o| o.label == first.label) {
            first.label
        } else {
            "item"
        };
        let record = OmissionRecord::new(
            OmissionKind::Declarations,
            label,
            run.len(),
            count_lines(&ctx.source[start..end]),
            ctx.location(start, end),
        );
        run.clear();

        let (from, to, placement) = match expand_to_lines(ctx.source, start, end) {
            Some((from, to)) => (
                from,
                to,
                Placement::OwnLine {
                    indent: indentation_at(ctx.source, start),
                    line_ending: ctx.line_ending,
                },
            ),
            None => (start, end, Placement::Inline),
        };
        let replacement = render(&record, &ctx.spec.placeholder, placement).unwrap_or_default();
        buffer.add(Edit::new(from, to, replacement, Pass::PublicApi).with_omission(record));
    }
}

/// End of a declaration, including a separate `;` or `,` terminator.
fn unit_end(node: Node<'_>, source: &str) -> usize {
    match node.next_sibling() {
        Some(next) if !next.is_named() && matches!(next.kind(), ";" | ",") => next.end_byte(),
        _ => trimmed_end(node, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::reducers::run_passes;
    use crate::condense::tokens::HeuristicCounter;
    use crate::condense::{tree::parse, LanguageId};

    fn public(src: &str, lang: LanguageId) -> String {
        let tree = parse(src, lang).unwrap();
        let config = ReductionPolicyConfig {
            public_api_only: true,
            ..Default::default()
        };
        run_passes(&tree, src, &config, &HeuristicCounter).unwrap().text
    }

    #[test]
    fn test_rust_private_items_removed() {
        let src = "pub fn api() {}\n\n/// Helper.\nfn helper() {}\nfn other() {}\n\npub(crate) fn internal() {}\n";
        let out = public(src, LanguageId::Rust);
        assert_eq!(
            out,
            "pub fn api() {}\n\n// … 3 functions omitted (5 lines)\n"
        );
    }

    #[test]
    fn test_rust_neutral_items_break_runs() {
        let src = "fn a() {}\nuse std::io;\nfn b() {}\n";
        let out = public(src, LanguageId::Rust);
        assert_eq!(
            out,
            "// … 1 function omitted (1 line)\nuse std::io;\n// … 1 function omitted (1 line)\n"
        );
    }

    #[test]
    fn test_rust_impl_members() {
        let src = "pub struct S;\n\nimpl S {\n    pub fn new() -> Self { S }\n\n    fn secret(&self) {}\n}\n\nimpl Clone for S {\n    fn clone(&self) -> Self { S }\n}\n";
        let out = public(src, LanguageId::Rust);
        assert_eq!(
            out,
            "pub struct S;\n\nimpl S {\n    pub fn new() -> Self { S }\n\n    // … 1 method omitted (1 line)\n}\n\nimpl Clone for S {\n    fn clone(&self) -> Self { S }\n}\n"
        );
    }

    #[test]
    fn test_typescript_exports_and_private_members() {
        let src = "export class Store {\n  private cache = new Map();\n  get(key: string) { return key; }\n}\n\nfunction internal() {}\n";
        let out = public(src, LanguageId::TypeScript);
        assert_eq!(
            out,
            "export class Store {\n  // … 1 field omitted (1 line)\n  get(key: string) { return key; }\n}\n\n// … 1 function omitted (1 line)\n"
        );
    }

    #[test]
    fn test_typescript_export_clause_keeps_declaration() {
        let src = "function foo() {\n  return 1;\n}\n\nfunction bar() {}\n\nexport { foo };\n";
        assert_eq!(
            public(src, LanguageId::TypeScript),
            "function foo() {\n  return 1;\n}\n\n// … 1 function omitted (1 line)\n\nexport { foo };\n"
        );
    }

    #[test]
    fn test_typescript_default_export_keeps_declaration() {
        let src = "class Store {\n  private cache = 1;\n  get() { return 1; }\n}\n\nconst helper = 2;\n\nexport default Store;\n";
        assert_eq!(
            public(src, LanguageId::TypeScript),
            "class Store {\n  // … 1 field omitted (1 line)\n  get() { return 1; }\n}\n\n// … 1 variable omitted (1 line)\n\nexport default Store;\n"
        );
    }

    #[test]
    fn test_typescript_script_keeps_everything() {
        let src = "function a() {}\nconst b = 1;\n";
        assert_eq!(public(src, LanguageId::TypeScript), src);
    }

    #[test]
    fn test_python_underscore_and_dunder() {
        let src = "class A:\n    def __init__(self):\n        pass\n\n    def _hidden(self):\n        pass\n\n\ndef _private():\n    pass\n";
        let out = public(src, LanguageId::Python);
        assert_eq!(
            out,
            "class A:\n    def __init__(self):\n        pass\n\n    # … 1 method omitted (2 lines)\n\n\n# … 1 function omitted (2 lines)\n"
        );
    }

    #[test]
    fn test_decorators_go_with_declaration() {
        let src = "@cache\ndef _load():\n    pass\n\ndef run():\n    pass\n";
        let out = public(src, LanguageId::Python);
        assert_eq!(out, "# … 1 function omitted (3 lines)\n\ndef run():\n    pass\n");
    }

    #[test]
    fn test_go_capitalization() {
        let src = "package p\n\nfunc Exported() {}\n\nfunc hidden() {}\n\ntype config struct{}\n";
        let out = public(src, LanguageId::Go);
        assert_eq!(
            out,
            "package p\n\nfunc Exported() {}\n\n// … 2 items omitted (3 lines)\n"
        );
    }

    #[test]
    fn test_go_struct_fields_filtered() {
        let src = "package p\n\ntype Config struct {\n\tName  string\n\tsecret string\n\tlimit int\n}\n\ntype ID int\n";
        assert_eq!(
            public(src, LanguageId::Go),
            "package p\n\ntype Config struct {\n\tName  string\n\t// … 2 fields omitted (2 lines)\n}\n\ntype ID int\n"
        );
    }

    #[test]
    fn test_c_static_is_private() {
        let src = "static int helper(void) { return 1; }\nint api(void) { return helper(); }\n";
        let out = public(src, LanguageId::C);
        assert_eq!(out, "// … 1 function omitted (1 line)\nint api(void) { return helper(); }\n");
    }
}
