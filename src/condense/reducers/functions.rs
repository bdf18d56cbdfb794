//! Function body stripper.
//!
//! Replaces function bodies with a placeholder that reports how many lines
//! were removed. Signatures and leading doc comments stay; Python docstrings
//! stay above the placeholder. Bodies written on a single line are never
//! touched.

use tracing::trace;
use tree_sitter::Node;

use super::{ReduceContext, Reducer};
use crate::condense::common::{
    clean_region_end_after, clean_region_end_before, clean_region_start, count_lines, indentation_at,
    is_line_start, line_start, only_whitespace_after, only_whitespace_before, trim_whitespace_back, trimmed_end,
};
use crate::condense::edit::{Edit, EditBuffer, Pass};
use crate::condense::placeholder::{render, OmissionKind, OmissionRecord, Placement};
use crate::condense::policy::{BodyMode, BodyShape, ReductionPolicyConfig};
use crate::condense::query::QueryName;
use crate::condense::tree::{child_of_kind, named_children, within_any};
use crate::condense::BodyStyle;
use crate::error::ReduceError;

pub struct FunctionBodyReducer;

/// A planned body replacement: `lead + marker + tail` over `from..to`.
struct Strip<'s> {
    from: usize,
    to: usize,
    lines: usize,
    lead: &'s str,
    placement: Placement<'s>,
    tail: &'s str,
}

impl Reducer for FunctionBodyReducer {
    fn pass(&self) -> Pass {
        Pass::FunctionBodies
    }

    fn is_active(&self, config: &ReductionPolicyConfig) -> bool {
        config.strip_function_bodies.mode != BodyMode::None
    }

    fn reduce(&self, ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>) -> Result<(), ReduceError> {
        let policy = &ctx.config.strip_function_bodies;
        let mut stripped: Vec<(usize, usize)> = Vec::new();

        for capture in ctx.captures(QueryName::Functions) {
            let Some(body) = capture.get("body") else {
                trace!(kind = capture.def().kind(), "function capture without body");
                continue;
            };
            let span = (body.start_byte(), body.end_byte());
            if within_any(&stripped, span) || !ctx.spec.body_kinds.contains(&body.kind()) {
                continue;
            }
            if body.start_position().row == body.end_position().row {
                continue;
            }

            let plan = match (ctx.spec.body_style, policy.shape) {
                (BodyStyle::Braces, BodyShape::InsideDelimiters) => inside_braces(ctx, body),
                (BodyStyle::Braces, BodyShape::Collapse) => collapse_braces(ctx, body),
                (BodyStyle::Indented, BodyShape::InsideDelimiters) => inside_indented(ctx, body),
                (BodyStyle::Indented, BodyShape::Collapse) => collapse_indented(ctx, capture.def(), body),
            };
            let Some(plan) = plan else {
                continue;
            };
            if plan.lines == 0 || (policy.mode == BodyMode::LargeOnly && plan.lines < policy.min_lines) {
                continue;
            }

            let record = OmissionRecord::new(
                OmissionKind::FunctionBody,
                "function",
                1,
                plan.lines,
                ctx.location(plan.from, plan.to),
            );
            let Some(marker) = render(&record, &ctx.spec.placeholder, plan.placement) else {
                continue;
            };
            let replacement = format!("{}{marker}{}", plan.lead, plan.tail);
            buffer.add(Edit::new(plan.from, plan.to, replacement, Pass::FunctionBodies).with_omission(record));
            stripped.push(span);
        }
        Ok(())
    }
}

/// Interior of a `{ ... }` body, braces kept.
fn inside_braces<'s>(ctx: &ReduceContext<'s>, body: Node<'_>) -> Option<Strip<'s>> {
    let source = ctx.source;
    let (open, close) = (body.start_byte(), body.end_byte().checked_sub(1)?);
    if source.as_bytes().get(open) != Some(&b'{') || source.as_bytes().get(close) != Some(&b'}') {
        trace!(kind = body.kind(), "body is not brace delimited");
        return None;
    }
    let from = clean_region_start(source, open + 1);
    let to = clean_region_end_before(source, close);
    if from >= to || source[from..to].trim().is_empty() {
        return None;
    }

    let region = &source[from..to];
    let lines = count_lines(region);
    let first_code = from + (region.len() - region.trim_start().len());
    let eol = ctx.line_ending.as_str();

    let strip = if is_line_start(source, from) && is_line_start(source, to) {
        Strip {
            from,
            to,
            lines,
            lead: "",
            placement: Placement::OwnLine {
                indent: indentation_at(source, first_code),
                line_ending: ctx.line_ending,
            },
            tail: "",
        }
    } else {
        Strip {
            from,
            to,
            lines,
            lead: if is_line_start(source, from) { indentation_at(source, first_code) } else { " " },
            placement: Placement::Inline,
            tail: if is_line_start(source, to) { eol } else { " " },
        }
    };
    Some(strip)
}

/// Whole `{ ... }` body replaced by a marker after the signature.
fn collapse_braces<'s>(ctx: &ReduceContext<'s>, body: Node<'_>) -> Option<Strip<'s>> {
    let from = trim_whitespace_back(ctx.source, body.start_byte());
    let to = body.end_byte();
    let lines = body.end_position().row - body.start_position().row + 1;
    let placement = if only_whitespace_after(ctx.source, to) {
        Placement::Trailing
    } else {
        Placement::Inline
    };
    Some(Strip {
        from,
        to,
        lines,
        lead: " ",
        placement,
        tail: "",
    })
}

/// Statements of an indented block after its docstring, replaced by one
/// placeholder line at the block's indentation.
fn inside_indented<'s>(ctx: &ReduceContext<'s>, block: Node<'_>) -> Option<Strip<'s>> {
    let source = ctx.source;
    let statements = named_children(block);
    let skip = usize::from(statements.first().is_some_and(|s| is_docstring_statement(*s)));
    let first = *statements.get(skip)?;
    if !only_whitespace_before(source, first.start_byte()) {
        return None;
    }
    let from = line_start(source, first.start_byte());
    let to = clean_region_end_after(source, trimmed_end(block, source));
    if from >= to {
        return None;
    }
    Some(Strip {
        from,
        to,
        lines: count_lines(&source[from..to]),
        lead: "",
        placement: Placement::OwnLine {
            indent: indentation_at(source, first.start_byte()),
            line_ending: ctx.line_ending,
        },
        tail: "",
    })
}

/// Everything after the signature's colon replaced by a trailing marker.
fn collapse_indented<'s>(ctx: &ReduceContext<'s>, def: Node<'_>, block: Node<'_>) -> Option<Strip<'s>> {
    let colon = child_of_kind(def, &[":"])?;
    let from = colon.end_byte();
    let to = clean_region_end_after(ctx.source, trimmed_end(block, ctx.source));
    let lines = block.end_position().row - block.start_position().row + 1;
    Some(Strip {
        from,
        to,
        lines,
        lead: " ",
        placement: Placement::Trailing,
        tail: if is_line_start(ctx.source, to) { ctx.line_ending.as_str() } else { "" },
    })
}

/// A statement consisting of a bare string literal.
fn is_docstring_statement(node: Node<'_>) -> bool {
    node.kind() == "expression_statement"
        && node.named_child_count() == 1
        && node.named_child(0).is_some_and(|c| c.kind() == "string")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::reducers::run_passes;
    use crate::condense::tokens::HeuristicCounter;
    use crate::condense::{tree::parse, LanguageId};

    fn strip(src: &str, lang: LanguageId, mode: BodyMode, min_lines: usize, shape: BodyShape) -> String {
        let tree = parse(src, lang).unwrap();
        let mut config = ReductionPolicyConfig::default();
        config.strip_function_bodies.mode = mode;
        config.strip_function_bodies.min_lines = min_lines;
        config.strip_function_bodies.shape = shape;
        run_passes(&tree, src, &config, &HeuristicCounter).unwrap().text
    }

    #[test]
    fn test_rust_inside_delimiters() {
        let src = "/// Adds.\nfn add(a: i32, b: i32) -> i32 {\n    let c = a + b;\n    c\n}\n";
        let out = strip(src, LanguageId::Rust, BodyMode::All, 1, BodyShape::InsideDelimiters);
        assert_eq!(
            out,
            "/// Adds.\nfn add(a: i32, b: i32) -> i32 {\n    // … function body omitted (2 lines)\n}\n"
        );
    }

    #[test]
    fn test_single_line_body_kept() {
        let src = "fn one() -> i32 { 1 }\n";
        let out = strip(src, LanguageId::Rust, BodyMode::All, 1, BodyShape::InsideDelimiters);
        assert_eq!(out, src);
    }

    #[test]
    fn test_large_only_threshold() {
        let src = "function small() {\n  return 1;\n}\n\nfunction big() {\n  a();\n  b();\n  c();\n}\n";
        let out = strip(src, LanguageId::JavaScript, BodyMode::LargeOnly, 3, BodyShape::InsideDelimiters);
        assert_eq!(
            out,
            "function small() {\n  return 1;\n}\n\nfunction big() {\n  // … function body omitted (3 lines)\n}\n"
        );
    }

    #[test]
    fn test_nested_bodies_not_revisited() {
        let src = "function outer() {\n  function inner() {\n    work();\n  }\n  inner();\n}\n";
        let out = strip(src, LanguageId::JavaScript, BodyMode::All, 1, BodyShape::InsideDelimiters);
        assert_eq!(out, "function outer() {\n  // … function body omitted (4 lines)\n}\n");
    }

    #[test]
    fn test_collapse_shape() {
        let src = "func Run() error {\n\tstart()\n\treturn nil\n}\n";
        let out = strip(src, LanguageId::Go, BodyMode::All, 1, BodyShape::Collapse);
        assert_eq!(out, "func Run() error // … function body omitted (4 lines)\n");
    }

    #[test]
    fn test_collapse_uses_block_comment_before_code() {
        let src = "const f = () => {\n  go();\n};\n";
        let out = strip(src, LanguageId::TypeScript, BodyMode::All, 1, BodyShape::Collapse);
        assert_eq!(out, "const f = () => /* … function body omitted (3 lines) */;\n");
    }

    #[test]
    fn test_python_keeps_docstring() {
        let src = "def load(path):\n    \"\"\"Load a file.\"\"\"\n    with open(path) as f:\n        return f.read()\n";
        let out = strip(src, LanguageId::Python, BodyMode::All, 1, BodyShape::InsideDelimiters);
        assert_eq!(
            out,
            "def load(path):\n    \"\"\"Load a file.\"\"\"\n    # … function body omitted (2 lines)\n"
        );
    }

    #[test]
    fn test_python_collapse() {
        let src = "def f(x):\n    y = x + 1\n    return y\n\nz = 1\n";
        let out = strip(src, LanguageId::Python, BodyMode::All, 1, BodyShape::Collapse);
        assert_eq!(out, "def f(x): # … function body omitted (2 lines)\n\nz = 1\n");
    }

    #[test]
    fn test_c_function() {
        let src = "int main(void) {\n    puts(\"hi\");\n    return 0;\n}\n";
        let out = strip(src, LanguageId::C, BodyMode::All, 1, BodyShape::InsideDelimiters);
        assert_eq!(out, "int main(void) {\n    // … function body omitted (2 lines)\n}\n");
    }
}
