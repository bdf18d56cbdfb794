//! Omission records and placeholder comment rendering.
//!
//! Every reducer describes what it removed with an [`OmissionRecord`]; the
//! formatter turns the record into a comment in the file's own syntax.

use serde::Serialize;

use super::common::{plural, LineEnding};

/// Horizontal ellipsis used in every marker.
pub const ELLIPSIS: &str = "\u{2026}";
/// Minus sign used in token deltas.
pub const MINUS: &str = "\u{2212}";

// ============ Comment Syntax ============

/// Comment syntax available to placeholders in one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderSpec {
    pub line: Option<&'static str>,
    pub block: Option<(&'static str, &'static str)>,
}

impl PlaceholderSpec {
    pub const C_STYLE: Self = Self {
        line: Some("//"),
        block: Some(("/*", "*/")),
    };
    pub const HASH: Self = Self {
        line: Some("#"),
        block: None,
    };
    pub const CSS: Self = Self {
        line: None,
        block: Some(("/*", "*/")),
    };
    pub const HTML: Self = Self {
        line: None,
        block: Some(("<!--", "-->")),
    };

    fn block_comment(&self, message: &str) -> Option<String> {
        self.block
            .map(|(open, close)| format!("{open} {ELLIPSIS} {message} {close}"))
    }

    fn line_comment(&self, message: &str) -> Option<String> {
        self.line.map(|prefix| format!("{prefix} {ELLIPSIS} {message}"))
    }
}

// ============ Omission Records ============

/// What kind of construct an omission removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OmissionKind {
    Comments,
    DocTruncated,
    Imports,
    StringLiteral,
    CollectionLiteral,
    FunctionBody,
    Declarations,
}

/// Where an omission starts in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub start_byte: usize,
    pub end_byte: usize,
    /// One-based line of `start_byte`.
    pub line: usize,
}

/// One omitted region and what it contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmissionRecord {
    pub kind: OmissionKind,
    /// Singular noun for the omitted items ("method", "import").
    pub unit_label: &'static str,
    /// Number of items omitted.
    pub count: usize,
    /// Lines of the original omitted span.
    pub lines: usize,
    pub tokens_removed: Option<usize>,
    pub location: Location,
}

impl OmissionRecord {
    pub fn new(kind: OmissionKind, unit_label: &'static str, count: usize, lines: usize, location: Location) -> Self {
        Self {
            kind,
            unit_label,
            count,
            lines,
            tokens_removed: None,
            location,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: usize) -> Self {
        self.tokens_removed = Some(tokens);
        self
    }

    /// Marker text without comment syntax or ellipsis, or `None` when the
    /// omission gets no marker.
    pub fn message(&self) -> Option<String> {
        let lines = line_phrase(self.lines);
        let tokens = self.tokens_removed.unwrap_or(0);
        match self.kind {
            OmissionKind::FunctionBody => Some(format!("{} body omitted ({lines})", self.unit_label)),
            OmissionKind::Comments if self.count == 1 => Some(format!("comment omitted ({lines})")),
            OmissionKind::Comments | OmissionKind::Imports | OmissionKind::Declarations => Some(format!(
                "{} {} omitted ({lines})",
                self.count,
                plural(self.unit_label, self.count)
            )),
            OmissionKind::StringLiteral => Some(format!("({MINUS}{tokens} tokens)")),
            OmissionKind::CollectionLiteral => Some(format!("({} more, {MINUS}{tokens} tokens)", self.count)),
            OmissionKind::DocTruncated => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self.kind {
            OmissionKind::StringLiteral => self.tokens_removed.unwrap_or(0) == 0,
            OmissionKind::CollectionLiteral => self.count == 0,
            _ => self.count == 0 || self.lines == 0,
        }
    }
}

fn line_phrase(lines: usize) -> String {
    if lines == 1 {
        "1 line".to_string()
    } else {
        format!("{lines} lines")
    }
}

// ============ Rendering ============

/// Where a placeholder goes relative to surrounding code.
#[derive(Debug, Clone, Copy)]
pub enum Placement<'a> {
    /// On a line of its own, with the replaced region's indentation.
    OwnLine { indent: &'a str, line_ending: LineEnding },
    /// Between tokens on a line that continues after the marker.
    Inline,
    /// At the end of a line.
    Trailing,
}

/// Render the placeholder for `omission`.
///
/// Returns `None` for omissions that carry nothing to report. Inline markers
/// use block comments when the language has them; trailing and own-line
/// markers prefer line comments.
pub fn render(omission: &OmissionRecord, spec: &PlaceholderSpec, placement: Placement<'_>) -> Option<String> {
    if omission.is_empty() {
        return None;
    }
    let message = omission.message()?;
    match placement {
        Placement::OwnLine { indent, line_ending } => {
            let comment = spec.line_comment(&message).or_else(|| spec.block_comment(&message))?;
            Some(format!("{indent}{comment}{}", line_ending.as_str()))
        }
        Placement::Inline => spec.block_comment(&message).or_else(|| spec.line_comment(&message)),
        Placement::Trailing => spec.line_comment(&message).or_else(|| spec.block_comment(&message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: OmissionKind, label: &'static str, count: usize, lines: usize) -> OmissionRecord {
        let location = Location {
            start_byte: 0,
            end_byte: 0,
            line: 1,
        };
        OmissionRecord::new(kind, label, count, lines, location)
    }

    fn own_line(indent: &str) -> Placement<'_> {
        Placement::OwnLine {
            indent,
            line_ending: LineEnding::Lf,
        }
    }

    #[test]
    fn test_body_marker() {
        let rec = record(OmissionKind::FunctionBody, "function", 1, 6);
        assert_eq!(
            render(&rec, &PlaceholderSpec::C_STYLE, own_line("    ")).unwrap(),
            "    // … function body omitted (6 lines)\n"
        );
        assert_eq!(
            render(&rec, &PlaceholderSpec::HASH, own_line("")).unwrap(),
            "# … function body omitted (6 lines)\n"
        );
    }

    #[test]
    fn test_counted_markers() {
        let imports = record(OmissionKind::Imports, "import", 8, 10);
        assert_eq!(
            render(&imports, &PlaceholderSpec::C_STYLE, Placement::Trailing).unwrap(),
            "// … 8 imports omitted (10 lines)"
        );
        let methods = record(OmissionKind::Declarations, "method", 4, 34);
        assert_eq!(methods.message().unwrap(), "4 methods omitted (34 lines)");
        let one = record(OmissionKind::Comments, "comment", 1, 1);
        assert_eq!(one.message().unwrap(), "comment omitted (1 line)");
    }

    #[test]
    fn test_literal_markers() {
        let coll = record(OmissionKind::CollectionLiteral, "element", 48, 48).with_tokens(528);
        assert_eq!(
            render(&coll, &PlaceholderSpec::C_STYLE, Placement::Inline).unwrap(),
            "/* … (48 more, −528 tokens) */"
        );
        let string = record(OmissionKind::StringLiteral, "string", 1, 1).with_tokens(12);
        assert_eq!(
            render(&string, &PlaceholderSpec::HASH, Placement::Inline).unwrap(),
            "# … (−12 tokens)"
        );
    }

    #[test]
    fn test_block_only_languages() {
        let rec = record(OmissionKind::Comments, "comment", 3, 5);
        assert_eq!(
            render(&rec, &PlaceholderSpec::CSS, own_line("  ")).unwrap(),
            "  /* … 3 comments omitted (5 lines) */\n"
        );
        assert_eq!(
            render(&rec, &PlaceholderSpec::HTML, Placement::Trailing).unwrap(),
            "<!-- … 3 comments omitted (5 lines) -->"
        );
    }

    #[test]
    fn test_empty_regions_render_nothing() {
        let rec = record(OmissionKind::FunctionBody, "function", 1, 0);
        assert!(render(&rec, &PlaceholderSpec::C_STYLE, Placement::Inline).is_none());
        let doc = record(OmissionKind::DocTruncated, "doc comment", 1, 3);
        assert!(render(&doc, &PlaceholderSpec::C_STYLE, Placement::Inline).is_none());
    }

    #[test]
    fn test_crlf_own_line() {
        let rec = record(OmissionKind::Imports, "import", 2, 2);
        let placement = Placement::OwnLine {
            indent: "",
            line_ending: LineEnding::CrLf,
        };
        assert_eq!(
            render(&rec, &PlaceholderSpec::C_STYLE, placement).unwrap(),
            "// … 2 imports omitted (2 lines)\r\n"
        );
    }
}
