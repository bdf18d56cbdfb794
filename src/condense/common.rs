//! Common text utilities shared by every reducer and language table.
//!
//! All offsets are byte offsets into the original source buffer. Helpers
//! never allocate unless they have to build new text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tree_sitter::Node;

// ============ Line Endings ============

/// Line-ending convention of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    /// Detect the convention from the first line break in `source`.
    pub fn detect(source: &str) -> Self {
        match source.find('\n') {
            Some(pos) if pos > 0 && source.as_bytes()[pos - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

// ============ Node Text ============

/// Get the exact text of a tree-sitter node.
pub fn get_node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    let slice = source.get(node.start_byte()..node.end_byte()).unwrap_or(&[]);
    std::str::from_utf8(slice).unwrap_or("")
}

/// End offset of a node with trailing whitespace excluded. Some grammars
/// include the terminating newline in line comments.
pub fn trimmed_end(node: Node, source: &str) -> usize {
    let start = node.start_byte();
    let text = source.get(start..node.end_byte()).unwrap_or("");
    start + text.trim_end().len()
}

// ============ Line Geometry ============

/// Count newline-delimited lines in `text`.
///
/// A trailing newline terminates the last line rather than starting a new
/// one, so `"a\nb\n"` and `"a\nb"` are both two lines and `""` is zero.
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let newlines = text.bytes().filter(|&b| b == b'\n').count();
    if text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// One-based line number of byte offset `pos`.
pub fn line_number(source: &str, pos: usize) -> usize {
    let end = pos.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Offset of the first byte of the line containing `pos`.
pub fn line_start(source: &str, pos: usize) -> usize {
    let pos = pos.min(source.len());
    source[..pos].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Offset of the line break (or end of buffer) ending the line containing
/// `pos`. A `\r` before the `\n` is left inside the line.
pub fn line_end(source: &str, pos: usize) -> usize {
    let pos = pos.min(source.len());
    source[pos..].find('\n').map_or(source.len(), |nl| pos + nl)
}

/// Offset just past the line break ending the line containing `pos`.
pub fn next_line_start(source: &str, pos: usize) -> usize {
    let end = line_end(source, pos);
    if end < source.len() {
        end + 1
    } else {
        end
    }
}

/// True if `pos` is the first byte of a line.
pub fn is_line_start(source: &str, pos: usize) -> bool {
    pos == 0 || source.as_bytes().get(pos - 1) == Some(&b'\n')
}

/// True if only spaces or tabs precede `pos` on its line.
pub fn only_whitespace_before(source: &str, pos: usize) -> bool {
    let start = line_start(source, pos);
    source[start..pos.min(source.len())]
        .bytes()
        .all(|b| b == b' ' || b == b'\t')
}

/// True if only whitespace follows `pos` up to the end of its line.
pub fn only_whitespace_after(source: &str, pos: usize) -> bool {
    let end = line_end(source, pos);
    source[pos.min(end)..end].trim().is_empty()
}

/// Leading indentation of the line containing `pos`.
pub fn indentation_at(source: &str, pos: usize) -> &str {
    let start = line_start(source, pos);
    let line = &source[start..line_end(source, pos)];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Start of the region that begins right after `pos`: the next line if the
/// rest of the current line is blank, otherwise `pos` itself.
pub fn clean_region_start(source: &str, pos: usize) -> usize {
    if only_whitespace_after(source, pos) {
        next_line_start(source, pos)
    } else {
        pos
    }
}

/// End of the region that stops right before `pos`: the start of the line if
/// only indentation precedes `pos`, otherwise `pos` itself.
pub fn clean_region_end_before(source: &str, pos: usize) -> usize {
    if only_whitespace_before(source, pos) {
        line_start(source, pos)
    } else {
        pos
    }
}

/// End of the region that stops right after `pos`: past the line break if
/// the rest of the line is blank, otherwise `pos` itself.
pub fn clean_region_end_after(source: &str, pos: usize) -> usize {
    if is_line_start(source, pos) {
        pos
    } else if only_whitespace_after(source, pos) {
        next_line_start(source, pos)
    } else {
        pos
    }
}

/// Expand `[start, end)` to whole lines when nothing but whitespace shares
/// those lines with it. Returns `None` when the span cannot be expanded.
pub fn expand_to_lines(source: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    if !only_whitespace_before(source, start) {
        return None;
    }
    let tail = clean_region_end_after(source, end);
    if tail == end && !is_line_start(source, end) && end < source.len() {
        return None;
    }
    Some((line_start(source, start), tail))
}

/// True if the text between `a` and `b` contains an empty line.
pub fn has_blank_line_between(source: &str, a: usize, b: usize) -> bool {
    if a >= b {
        return false;
    }
    source[a..b].bytes().filter(|&b| b == b'\n').count() >= 2
}

/// True if the text between `a` and `b` is whitespace only.
pub fn only_whitespace_between(source: &str, a: usize, b: usize) -> bool {
    a >= b || source[a..b].trim().is_empty()
}

/// Offset just past the last non-whitespace byte before `pos`.
pub fn trim_whitespace_back(source: &str, pos: usize) -> usize {
    source[..pos.min(source.len())].trim_end().len()
}

// ============ Strings ============

/// Split a string literal into `(open, close)` delimiter lengths.
///
/// Handles prefixes (`r`, `b`, `f`, `u8`, ...), Rust raw-string hashes,
/// triple quotes and backticks. Returns `None` for anything else.
pub fn string_delimiters(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    let mut hashes = 0;
    while i < bytes.len() && bytes[i] == b'#' {
        i += 1;
        hashes += 1;
    }
    let quote = *bytes.get(i)?;
    if !matches!(quote, b'"' | b'\'' | b'`') {
        return None;
    }
    let run = bytes[i..].iter().take(3).take_while(|&&b| b == quote).count();
    let quotes = if run == 3 { 3 } else { 1 };
    let open = i + quotes;
    let close = quotes + hashes;
    if open + close > bytes.len() {
        return None;
    }
    let tail = &bytes[bytes.len() - close..];
    let closes = tail[..quotes].iter().all(|&b| b == quote) && tail[quotes..].iter().all(|&b| b == b'#');
    closes.then_some((open, close))
}

// ============ Comment Text ============

static LINE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?://!|///?|#)\s?").expect("static regex")
});
static BLOCK_LINE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\*(?:\s|$)").expect("static regex"));

/// Leading marker of a line comment (`///`, `//!`, `//`, `#`).
pub fn line_comment_marker(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    ["///", "//!", "//", "#"]
        .into_iter()
        .find(|marker| trimmed.starts_with(marker))
        .map(|marker| &trimmed[..marker.len()])
}

/// Doc comment markers shared by the C family: `///`, `//!`, `/**`, `/*!`.
pub fn is_c_style_doc(text: &str) -> bool {
    (text.starts_with("///") && !text.starts_with("////"))
        || text.starts_with("//!")
        || (text.starts_with("/**") && !text.starts_with("/**/"))
        || text.starts_with("/*!")
}

/// Strip comment syntax from a comment's text, returning its prose lines.
pub fn comment_body(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let block = ["/**", "/*!", "/*"]
        .into_iter()
        .find(|open| trimmed.starts_with(open));
    match block {
        Some(open) => {
            let inner = trimmed[open.len()..].trim_end_matches("*/");
            inner
                .lines()
                .map(|line| BLOCK_LINE_MARKER.replace(line, "").trim().to_string())
                .collect()
        }
        None => trimmed
            .lines()
            .map(|line| LINE_MARKER.replace(line, "").trim().to_string())
            .collect(),
    }
}

// ============ Sentences ============

/// Byte length of the first sentence of `text`, or `None` when the whole
/// text is a single sentence.
///
/// A sentence ends at the first `.`, `!` or `?` followed by whitespace or the
/// end of the text. Terminators inside backtick code spans do not count.
pub fn first_sentence_len(text: &str) -> Option<usize> {
    let mut in_code = false;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '`' => in_code = !in_code,
            '.' | '!' | '?' if !in_code => {
                let next = chars.peek().map(|&(_, c)| c);
                if next.map_or(true, char::is_whitespace) {
                    let end = idx + ch.len_utf8();
                    let rest = text[end..].trim();
                    return (!rest.is_empty()).then_some(end);
                }
            }
            _ => {}
        }
    }
    None
}

/// Collapse runs of whitespace to single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// English plural of a unit label.
pub fn plural(label: &str, count: usize) -> String {
    if count == 1 {
        return label.to_string();
    }
    if label.ends_with('s') || label.ends_with('x') || label.ends_with("ch") || label.ends_with("sh") {
        format!("{label}es")
    } else if let Some(stem) = label.strip_suffix('y') {
        format!("{stem}ies")
    } else {
        format!("{label}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\nb\n"), 2);
        assert_eq!(count_lines("a\nb"), 2);
        assert_eq!(count_lines("\n"), 1);
    }

    #[test]
    fn test_line_geometry() {
        let src = "fn a() {\n    body();\n}\n";
        let body = src.find("body").unwrap();
        assert_eq!(line_start(src, body), 9);
        assert_eq!(indentation_at(src, body), "    ");
        assert!(only_whitespace_before(src, body));
        assert!(!only_whitespace_before(src, body + 2));
        assert_eq!(line_number(src, body), 2);
        assert_eq!(next_line_start(src, body), src.find('}').unwrap());
    }

    #[test]
    fn test_expand_to_lines() {
        let src = "a\n    // x\nb // y\n";
        let x = src.find("// x").unwrap();
        assert_eq!(expand_to_lines(src, x, x + 4), Some((2, 10)));
        let y = src.find("// y").unwrap();
        assert_eq!(expand_to_lines(src, y, y + 4), None);
    }

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\nb\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("abc"), LineEnding::Lf);
    }

    #[test]
    fn test_string_delimiters() {
        assert_eq!(string_delimiters("\"abc\""), Some((1, 1)));
        assert_eq!(string_delimiters("r#\"abc\"#"), Some((3, 2)));
        assert_eq!(string_delimiters("\"\"\"doc\"\"\""), Some((3, 3)));
        assert_eq!(string_delimiters("f'x'"), Some((2, 1)));
        assert_eq!(string_delimiters("`tpl`"), Some((1, 1)));
        assert_eq!(string_delimiters("\"\""), Some((1, 1)));
        assert_eq!(string_delimiters("abc"), None);
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence_len("Parses input. Then more."), Some(13));
        assert_eq!(first_sentence_len("Only one sentence."), None);
        assert_eq!(first_sentence_len("Calls `a.b()` first. Rest"), Some(20));
        assert_eq!(first_sentence_len("Version 1.2 is fine! ok"), Some(20));
        assert_eq!(first_sentence_len("no terminator here"), None);
    }

    #[test]
    fn test_comment_body() {
        assert_eq!(comment_body("/// Hello there"), vec!["Hello there"]);
        assert_eq!(
            comment_body("/**\n * First.\n * Second.\n */"),
            vec!["", "First.", "Second.", ""]
        );
        assert_eq!(comment_body("# note"), vec!["note"]);
    }

    #[test]
    fn test_c_style_doc() {
        assert!(is_c_style_doc("/// Docs"));
        assert!(is_c_style_doc("//! Crate docs"));
        assert!(is_c_style_doc("/** Docs */"));
        assert!(!is_c_style_doc("//// banner"));
        assert!(!is_c_style_doc("/**/"));
        assert!(!is_c_style_doc("// plain"));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural("method", 1), "method");
        assert_eq!(plural("method", 4), "methods");
        assert_eq!(plural("class", 2), "classes");
        assert_eq!(plural("property", 3), "properties");
    }
}
