//! Large literal trimmer.
//!
//! Strings over the token threshold keep their longest prefix that fits,
//! followed by `…` and a `(−T tokens)` marker. Collections keep as many
//! leading elements as fit (at least one) and replace the rest with
//! `… (K more, −T tokens)`, keeping the closing delimiter in place.

use tracing::trace;
use tree_sitter::Node;

use super::{ReduceContext, Reducer};
use crate::condense::common::{
    count_lines, indentation_at, line_end, line_start, only_whitespace_before, string_delimiters,
};
use crate::condense::edit::{Edit, EditBuffer, Pass};
use crate::condense::placeholder::{render, OmissionKind, OmissionRecord, Placement, ELLIPSIS};
use crate::condense::policy::ReductionPolicyConfig;
use crate::condense::query::QueryName;
use crate::condense::tokens::TokenCounter;
use crate::condense::tree::{named_children, within_any};
use crate::error::ReduceError;

pub struct LiteralReducer;

/// Capture tags used by literal patterns.
pub const STRING: &str = "string";
pub const COLLECTION: &str = "collection";

impl Reducer for LiteralReducer {
    fn pass(&self) -> Pass {
        Pass::Literals
    }

    fn is_active(&self, config: &ReductionPolicyConfig) -> bool {
        config.literals.max_tokens.is_some()
    }

    fn reduce(&self, ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>) -> Result<(), ReduceError> {
        let Some(max_tokens) = ctx.config.literals.max_tokens else {
            return Ok(());
        };
        let captures = ctx.captures(QueryName::Literals);
        let literal_spans: Vec<(usize, usize)> = captures.iter().map(|c| c.span()).collect();
        let mut dropped: Vec<(usize, usize)> = Vec::new();

        for capture in &captures {
            let node = capture.def();
            if within_any(&dropped, capture.span()) {
                continue;
            }
            let original_tokens = ctx.counter.count_tokens(ctx.text(node));
            if original_tokens <= max_tokens {
                continue;
            }
            let trimmer = Trimmer {
                ctx,
                node,
                max_tokens,
                original_tokens,
                literal_spans: &literal_spans,
            };
            let span = match capture.tag() {
                STRING => trimmer.string(buffer),
                COLLECTION => trimmer.collection(buffer),
                _ => None,
            };
            dropped.extend(span);
        }
        Ok(())
    }
}

struct Trimmer<'c, 'a, 't> {
    ctx: &'c ReduceContext<'a>,
    node: Node<'t>,
    max_tokens: usize,
    original_tokens: usize,
    literal_spans: &'c [(usize, usize)],
}

impl Trimmer<'_, '_, '_> {
    /// Trim a string literal; returns the replaced span.
    fn string(&self, buffer: &mut EditBuffer<'_>) -> Option<(usize, usize)> {
        let ctx = self.ctx;
        let (start, end) = (self.node.start_byte(), self.node.end_byte());
        let text = ctx.text(self.node);
        let Some((open, close)) = string_delimiters(text) else {
            trace!(kind = self.node.kind(), "unrecognized string delimiters");
            return None;
        };
        let content = &text[open..text.len() - close];
        let keep = longest_prefix(ctx.counter, content, self.max_tokens);
        if keep == content.len() {
            return None;
        }
        let literal = format!(
            "{}{}{ELLIPSIS}{}",
            &text[..open],
            &content[..keep],
            &text[text.len() - close..]
        );
        let record = OmissionRecord::new(
            OmissionKind::StringLiteral,
            "string",
            1,
            count_lines(text),
            ctx.location(start, end),
        );

        if ctx.spec.placeholder.block.is_some() {
            let (delta, replacement) = settle(ctx.counter, self.original_tokens, |tokens| {
                let marker = render(&record.clone().with_tokens(tokens), &ctx.spec.placeholder, Placement::Inline);
                let replacement = match marker {
                    Some(marker) => format!("{literal} {marker}"),
                    None => literal.clone(),
                };
                (replacement.clone(), replacement)
            });
            if delta == 0 {
                return None;
            }
            buffer.add(Edit::new(start, end, replacement, Pass::Literals).with_omission(record.with_tokens(delta)));
        } else {
            let at = self.marker_point(end);
            let (delta, marker) = settle(ctx.counter, self.original_tokens, |tokens| {
                let marker = at
                    .and_then(|_| render(&record.clone().with_tokens(tokens), &ctx.spec.placeholder, Placement::Trailing))
                    .map(|m| format!(" {m}"))
                    .unwrap_or_default();
                (format!("{literal}{marker}"), marker)
            });
            if delta == 0 {
                return None;
            }
            buffer.add(Edit::new(start, end, literal, Pass::Literals).with_omission(record.with_tokens(delta)));
            if let (Some(at), false) = (at, marker.is_empty()) {
                buffer.add(Edit::insert(at, marker, Pass::Literals));
            }
        }
        Some((start, end))
    }

    /// Trim a collection literal; returns the span of the dropped elements.
    fn collection(&self, buffer: &mut EditBuffer<'_>) -> Option<(usize, usize)> {
        let ctx = self.ctx;
        let node = self.node;
        let elements: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .filter(|child| !ctx.is_comment(*child))
            .collect();
        if elements.len() < 2 {
            return None;
        }

        let start = node.start_byte();
        let kept = {
            let prefix_tokens = |k: usize| ctx.counter.count_tokens(&ctx.source[start..elements[k - 1].end_byte()]);
            let (mut lo, mut hi) = (1, elements.len());
            while lo < hi {
                let mid = (lo + hi + 1) / 2;
                if prefix_tokens(mid) <= self.max_tokens {
                    lo = mid;
                } else {
                    hi = mid - 1;
                }
            }
            lo
        };
        if kept >= elements.len() {
            return None;
        }

        let first_dropped = elements[kept];
        let last_dropped = elements[elements.len() - 1];
        let close_start = closing_delimiter(node).unwrap_or(node.end_byte());
        let record = OmissionRecord::new(
            OmissionKind::CollectionLiteral,
            "element",
            elements.len() - kept,
            count_lines(&ctx.source[first_dropped.start_byte()..last_dropped.end_byte()]),
            ctx.location(first_dropped.start_byte(), last_dropped.end_byte()),
        );
        let measure = |from: usize, to: usize, middle: &str| {
            format!("{}{middle}{}", &ctx.source[start..from], &ctx.source[to..node.end_byte()])
        };

        let multi_line = close_start < node.end_byte()
            && only_whitespace_before(ctx.source, first_dropped.start_byte())
            && only_whitespace_before(ctx.source, close_start);

        if multi_line {
            let (from, to) = (line_start(ctx.source, first_dropped.start_byte()), line_start(ctx.source, close_start));
            let placement = Placement::OwnLine {
                indent: indentation_at(ctx.source, first_dropped.start_byte()),
                line_ending: ctx.line_ending,
            };
            let (delta, replacement) = settle(ctx.counter, self.original_tokens, |tokens| {
                let replacement =
                    render(&record.clone().with_tokens(tokens), &ctx.spec.placeholder, placement).unwrap_or_default();
                (measure(from, to, &replacement), replacement)
            });
            if delta == 0 {
                return None;
            }
            buffer.add(Edit::new(from, to, replacement, Pass::Literals).with_omission(record.with_tokens(delta)));
            return Some((from, to));
        }

        let (from, to) = (first_dropped.start_byte(), last_dropped.end_byte());
        if ctx.spec.placeholder.block.is_some() {
            let (delta, replacement) = settle(ctx.counter, self.original_tokens, |tokens| {
                let replacement = render(&record.clone().with_tokens(tokens), &ctx.spec.placeholder, Placement::Inline)
                    .unwrap_or_default();
                (measure(from, to, &replacement), replacement)
            });
            if delta == 0 {
                return None;
            }
            buffer.add(Edit::new(from, to, replacement, Pass::Literals).with_omission(record.with_tokens(delta)));
        } else {
            let filler = "...";
            let at = self.marker_point(node.end_byte());
            let (delta, marker) = settle(ctx.counter, self.original_tokens, |tokens| {
                let marker = at
                    .and_then(|_| render(&record.clone().with_tokens(tokens), &ctx.spec.placeholder, Placement::Trailing))
                    .map(|m| format!("  {m}"))
                    .unwrap_or_default();
                (format!("{}{marker}", measure(from, to, filler)), marker)
            });
            if delta == 0 {
                return None;
            }
            buffer.add(Edit::new(from, to, filler, Pass::Literals).with_omission(record.with_tokens(delta)));
            if let (Some(at), false) = (at, marker.is_empty()) {
                buffer.add(Edit::insert(at, marker, Pass::Literals));
            }
        }
        Some((from, to))
    }

    /// End of the line holding `pos`, unless that point lies inside another
    /// literal (a multi-line string continuing past it).
    fn marker_point(&self, pos: usize) -> Option<usize> {
        let at = line_end(self.ctx.source, pos);
        let at = if at > 0 && self.ctx.source.as_bytes()[at - 1] == b'\r' { at - 1 } else { at };
        let blocked = self.literal_spans.iter().any(|&(s, e)| s < at && at < e);
        (!blocked).then_some(at)
    }
}

/// Start of a collection's closing delimiter token.
fn closing_delimiter(node: Node<'_>) -> Option<usize> {
    let count = node.child_count();
    let last = node.child(count.checked_sub(1)?)?;
    (!last.is_named()).then(|| last.start_byte())
}

/// Byte length of the longest prefix of `content` within `max_tokens`.
fn longest_prefix(counter: &dyn TokenCounter, content: &str, max_tokens: usize) -> usize {
    let mut bounds: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
    bounds.push(content.len());
    let (mut lo, mut hi) = (0, bounds.len() - 1);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if counter.count_tokens(&content[..bounds[mid]]) <= max_tokens {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    bounds[lo]
}

/// Find the token delta that stays true once the marker reporting it is in
/// place. `build` returns the text to measure and the replacement. A delta
/// of zero means trimming does not pay for its own marker.
fn settle(
    counter: &dyn TokenCounter,
    original_tokens: usize,
    build: impl Fn(usize) -> (String, String),
) -> (usize, String) {
    let mut delta = 0;
    for _ in 0..8 {
        let (measured, replacement) = build(delta);
        let next = original_tokens.saturating_sub(counter.count_tokens(&measured));
        if next == delta {
            return (delta, replacement);
        }
        delta = next;
    }
    (0, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::reducers::run_passes;
    use crate::condense::{tree::parse, LanguageId};

    /// One token per whitespace-separated word.
    struct Words;

    impl TokenCounter for Words {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn trim(src: &str, lang: LanguageId, max: usize) -> String {
        let tree = parse(src, lang).unwrap();
        let mut config = ReductionPolicyConfig::default();
        config.literals.max_tokens = Some(max);
        run_passes(&tree, src, &config, &Words).unwrap().text
    }

    #[test]
    fn test_longest_prefix() {
        assert_eq!(longest_prefix(&Words, "a b c d", 2), 4);
        assert_eq!(longest_prefix(&Words, "a b", 5), 3);
    }

    fn numbers(n: usize, sep: &str) -> String {
        (1..=n).map(|i| i.to_string()).collect::<Vec<_>>().join(sep)
    }

    #[test]
    fn test_string_trimmed_with_marker() {
        let src = "const MSG: &str = \"a b c d e f g h i j k l m n o p q r s t\";\n";
        let out = trim(src, LanguageId::Rust, 3);
        assert_eq!(out, "const MSG: &str = \"a b c …\" /* … (−11 tokens) */;\n");
    }

    #[test]
    fn test_trim_that_does_not_pay_is_skipped() {
        let src = "const MSG: &str = \"a b c d e f\";\n";
        assert_eq!(trim(src, LanguageId::Rust, 3), src);
    }

    #[test]
    fn test_single_line_collection() {
        let src = format!("const xs = [{}];\n", numbers(30, ", "));
        let out = trim(&src, LanguageId::JavaScript, 3);
        assert_eq!(out, "const xs = [1, 2, 3, /* … (27 more, −20 tokens) */];\n");
    }

    #[test]
    fn test_multi_line_collection_keeps_indentation() {
        let src = format!("let xs = [\n    {},\n];\n", numbers(30, ",\n    "));
        let out = trim(&src, LanguageId::TypeScript, 2);
        assert_eq!(out, "let xs = [\n    1,\n    // … (29 more, −23 tokens)\n];\n");
    }

    #[test]
    fn test_python_collection_uses_trailing_marker() {
        let src = format!("xs = [{}]\n", numbers(30, ", "));
        let out = trim(&src, LanguageId::Python, 3);
        assert_eq!(out, "xs = [1, 2, 3, ...]  # … (27 more, −20 tokens)\n");
    }

    #[test]
    fn test_small_literals_untouched() {
        let src = "const xs = [1, 2];\n";
        assert_eq!(trim(src, LanguageId::JavaScript, 8), src);
    }
}
