//! Import summarizer.
//!
//! Consecutive imports (only whitespace between them, same parent) form a
//! group. Within a group every maximal run of imports the mode allows to be
//! stripped becomes one marker carrying the run's count.

use tree_sitter::Node;

use super::{ReduceContext, Reducer};
use crate::condense::common::{count_lines, expand_to_lines, indentation_at, only_whitespace_between, trimmed_end};
use crate::condense::edit::{Edit, EditBuffer, Pass};
use crate::condense::placeholder::{render, OmissionKind, OmissionRecord, Placement};
use crate::condense::policy::{ImportMode, ReductionPolicyConfig};
use crate::condense::query::QueryName;
use crate::condense::Locality;
use crate::error::ReduceError;

pub struct ImportReducer;

struct Import<'t> {
    node: Node<'t>,
    end: usize,
}

impl Reducer for ImportReducer {
    fn pass(&self) -> Pass {
        Pass::Imports
    }

    fn is_active(&self, config: &ReductionPolicyConfig) -> bool {
        config.imports.mode != ImportMode::KeepAll
    }

    fn reduce(&self, ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>) -> Result<(), ReduceError> {
        let mode = ctx.config.imports.mode;
        let mut run: Vec<Import<'_>> = Vec::new();
        let mut previous: Option<(Node<'_>, usize)> = None;

        for capture in ctx.captures(QueryName::Imports) {
            let node = capture.def();
            let locality = capture
                .get("path")
                .map_or(Locality::External, |path| classify_path(ctx, ctx.text(path)));
            let collapsible = match mode {
                ImportMode::KeepAll => false,
                ImportMode::StripAll => true,
                ImportMode::StripLocal => locality == Locality::Local,
                ImportMode::StripExternal => locality == Locality::External,
            };

            let consecutive = previous.is_some_and(|(prev, prev_end)| {
                prev.parent().map(|p| p.id()) == node.parent().map(|p| p.id())
                    && only_whitespace_between(ctx.source, prev_end, node.start_byte())
            });
            if !consecutive || !collapsible {
                flush(ctx, buffer, &mut run);
            }

            let end = trimmed_end(node, ctx.source);
            previous = Some((node, end));
            if collapsible {
                run.push(Import { node, end });
            }
        }

        flush(ctx, buffer, &mut run);
        Ok(())
    }
}

/// Locality of an import path, honouring configured local prefixes first.
fn classify_path(ctx: &ReduceContext<'_>, raw: &str) -> Locality {
    let bare = normalize_path(raw);
    let configured = ctx
        .config
        .imports
        .local_prefixes
        .iter()
        .any(|prefix| bare.starts_with(prefix.as_str()));
    if configured {
        Locality::Local
    } else {
        (ctx.spec.import_locality)(raw)
    }
}

/// Strip quotes and angle brackets from an import path.
pub fn normalize_path(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find(['"', '\'', '`', '<']), trimmed.rfind(['"', '\'', '`', '>'])) {
        (Some(open), Some(close)) if close > open => &trimmed[open + 1..close],
        _ => trimmed,
    }
}

fn flush(ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>, run: &mut Vec<Import<'_>>) {
    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return;
    };
    let start = first.node.start_byte();
    let end = last.end;
    let count = run.len();
    run.clear();

    let record = OmissionRecord::new(
        OmissionKind::Imports,
        "import",
        count,
        count_lines(&ctx.source[start..end]),
        ctx.location(start, end),
    );
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
    buffer.add(Edit::new(from, to, replacement, Pass::Imports).with_omission(record));
}
