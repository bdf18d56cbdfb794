//! Comment policy engine.
//!
//! Standalone comments separated only by whitespace collapse into one
//! counted marker. A run never crosses the boundary of a span claimed by a
//! higher pass, such as a removed declaration or a stripped body. Trailing comments are deleted together with the
//! whitespace before them and leave no marker. Under `keep_first_sentence`
//! doc comments are rewritten to their first sentence followed by `…`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{ReduceContext, Reducer};
use crate::condense::common::{
    comment_body, count_lines, expand_to_lines, first_sentence_len, has_blank_line_between,
    indentation_at, line_comment_marker, line_number, only_whitespace_before, only_whitespace_between,
    squash_whitespace, string_delimiters, trim_whitespace_back, trimmed_end,
};
use crate::condense::edit::{Edit, EditBuffer, Pass};
use crate::condense::placeholder::{render, OmissionKind, OmissionRecord, Placement, ELLIPSIS};
use crate::condense::policy::{CommentMode, ReductionPolicyConfig};
use crate::condense::query::QueryName;
use crate::error::ReduceError;

pub struct CommentReducer;

/// Tag carried by docstring captures.
pub const DOCSTRING: &str = "docstring";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Keep,
    Strip,
    Truncate,
}

#[derive(Debug, Clone, Copy)]
struct Item {
    start: usize,
    end: usize,
    docstring: bool,
    trailing: bool,
    action: Action,
}

impl Reducer for CommentReducer {
    fn pass(&self) -> Pass {
        Pass::Comments
    }

    fn is_active(&self, config: &ReductionPolicyConfig) -> bool {
        config.comments.mode != CommentMode::KeepAll
    }

    fn reduce(&self, ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>) -> Result<(), ReduceError> {
        let mode = ctx.config.comments.mode;
        let mut strip_run: Vec<Item> = Vec::new();
        let mut doc_run: Vec<Item> = Vec::new();
        let claimed = claimed_spans(buffer);

        for capture in ctx.captures(QueryName::Comments) {
            let node = capture.def();
            let start = node.start_byte();
            let text = ctx.text(node);
            if is_preamble(ctx.source, start, text) {
                continue;
            }

            let docstring = capture.tag() == DOCSTRING;
            let trailing = !docstring && !only_whitespace_before(ctx.source, start);
            let doc = docstring || (!trailing && (ctx.spec.is_doc_comment)(node, ctx.source));
            let action = match (mode, doc) {
                (CommentMode::KeepAll, _) => Action::Keep,
                (CommentMode::KeepDoc, true) => Action::Keep,
                (CommentMode::KeepFirstSentence, true) => Action::Truncate,
                _ => Action::Strip,
            };
            let item = Item {
                start,
                end: trimmed_end(node, ctx.source),
                docstring,
                trailing,
                action,
            };

            match action {
                Action::Keep => {
                    flush_strip(ctx, buffer, &mut strip_run);
                    flush_doc(ctx, buffer, &mut doc_run);
                }
                Action::Strip if item.trailing => {
                    flush_strip(ctx, buffer, &mut strip_run);
                    flush_doc(ctx, buffer, &mut doc_run);
                    let from = trim_whitespace_back(ctx.source, item.start);
                    let record = OmissionRecord::new(
                        OmissionKind::Comments,
                        "comment",
                        1,
                        count_lines(&ctx.source[item.start..item.end]),
                        ctx.location(item.start, item.end),
                    );
                    buffer.add(Edit::delete(from, item.end, Pass::Comments).with_omission(record));
                }
                Action::Strip => {
                    flush_doc(ctx, buffer, &mut doc_run);
                    let joins = strip_run.last().is_some_and(|last| {
                        only_whitespace_between(ctx.source, last.end, item.start) && same_region(&claimed, last, &item)
                    });
                    if !joins {
                        flush_strip(ctx, buffer, &mut strip_run);
                    }
                    strip_run.push(item);
                }
                Action::Truncate => {
                    flush_strip(ctx, buffer, &mut strip_run);
                    let joins = doc_run
                        .last()
                        .is_some_and(|last| continues_doc_run(ctx.source, last, &item) && same_region(&claimed, last, &item));
                    if !joins {
                        flush_doc(ctx, buffer, &mut doc_run);
                    }
                    doc_run.push(item);
                }
            }
        }

        flush_strip(ctx, buffer, &mut strip_run);
        flush_doc(ctx, buffer, &mut doc_run);
        Ok(())
    }
}

static ENCODING_DECLARATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#.*?coding[:=]").expect("static regex"));

/// Shebang and encoding lines at the top of a file.
fn is_preamble(source: &str, start: usize, text: &str) -> bool {
    (start == 0 && text.starts_with("#!"))
        || (line_number(source, start) <= 2 && ENCODING_DECLARATION.is_match(text))
}

/// Spans claimed by passes that outrank comments.
fn claimed_spans(buffer: &EditBuffer<'_>) -> Vec<(usize, usize)> {
    Pass::ALL
        .into_iter()
        .filter(|pass| *pass > Pass::Comments)
        .flat_map(|pass| buffer.spans_of(pass))
        .collect()
}

/// Whether one edit covering `a` through `b` would stay on one side of every
/// claimed span: either inside it with both items, or clear of it.
fn same_region(claimed: &[(usize, usize)], a: &Item, b: &Item) -> bool {
    claimed.iter().all(|&(start, end)| {
        let holds = |item: &Item| start <= item.start && item.end <= end;
        match (holds(a), holds(b)) {
            (true, true) => true,
            (false, false) => !(start < b.start && a.end < end),
            _ => false,
        }
    })
}

/// Two line-style doc comments with the same marker and nothing but a line
/// break between them belong to one doc comment.
fn continues_doc_run(source: &str, last: &Item, next: &Item) -> bool {
    if last.docstring || next.docstring {
        return false;
    }
    let marker = |item: &Item| line_comment_marker(&source[item.start..item.end]);
    marker(last).is_some()
        && marker(last) == marker(next)
        && only_whitespace_between(source, last.end, next.start)
        && !has_blank_line_between(source, last.end, next.start)
}

fn flush_strip(ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>, run: &mut Vec<Item>) {
    let (Some(first), Some(last)) = (run.first().copied(), run.last().copied()) else {
        return;
    };
    let count = run.len();
    run.clear();

    let (start, end, placement) = match expand_to_lines(ctx.source, first.start, last.end) {
        Some((start, end)) => (
            start,
            end,
            Placement::OwnLine {
                indent: indentation_at(ctx.source, first.start),
                line_ending: ctx.line_ending,
            },
        ),
        None => (first.start, last.end, Placement::Inline),
    };
    let lines = count_lines(&ctx.source[first.start..last.end]);
    let record = OmissionRecord::new(
        OmissionKind::Comments,
        "comment",
        count,
        lines,
        ctx.location(first.start, last.end),
    );
    let replacement = render(&record, &ctx.spec.placeholder, placement).unwrap_or_default();
    buffer.add(Edit::new(start, end, replacement, Pass::Comments).with_omission(record));
}

fn flush_doc(ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>, run: &mut Vec<Item>) {
    let (Some(first), Some(last)) = (run.first().copied(), run.last().copied()) else {
        return;
    };
    run.clear();

    let original = &ctx.source[first.start..last.end];
    let Some(replacement) = first_sentence_doc(original, first.docstring) else {
        trace!(line = line_number(ctx.source, first.start), "doc comment is a single sentence");
        return;
    };
    let record = OmissionRecord::new(
        OmissionKind::DocTruncated,
        "doc comment",
        1,
        count_lines(original),
        ctx.location(first.start, last.end),
    );
    buffer.add(Edit::new(first.start, last.end, replacement, Pass::Comments).with_omission(record));
}

/// Rewrite a doc comment to its first sentence, keeping its comment syntax.
/// Returns `None` when there is nothing after the first sentence.
fn first_sentence_doc(original: &str, docstring: bool) -> Option<String> {
    if docstring {
        let (open, close) = string_delimiters(original)?;
        let prose = squash_whitespace(&original[open..original.len() - close]);
        let len = first_sentence_len(&prose)?;
        return Some(format!(
            "{}{} {ELLIPSIS}{}",
            &original[..open],
            &prose[..len],
            &original[original.len() - close..]
        ));
    }

    let prose = squash_whitespace(&comment_body(original).join(" "));
    let len = first_sentence_len(&prose)?;
    let sentence = &prose[..len];
    match line_comment_marker(original) {
        Some(marker) => Some(format!("{marker} {sentence} {ELLIPSIS}")),
        None => {
            let open = original.get(..3).filter(|o| *o == "/**" || *o == "/*!").unwrap_or("/*");
            Some(format!("{open} {sentence} {ELLIPSIS} */"))
        }
    }
}
