//! Structural code condensation.
//!
//! Parses a source file once, runs policy-driven reducers that emit
//! byte-range edits against the original text, and applies them in one pass.
//! When a token budget is set the fitter tightens policies level by level
//! until the output fits.
//!
//! ## Architecture
//!
//! ```text
//! condense/
//! ├── mod.rs         - Language dispatch, capability records, entry points
//! ├── common.rs      - Text and line utilities
//! ├── tree.rs        - Parsed tree wrapper and navigation
//! ├── query.rs       - Declarative structural queries
//! ├── edit.rs        - Range edit buffer
//! ├── placeholder.rs - Omission records and marker rendering
//! ├── policy.rs      - Reduction policy configuration
//! ├── tokens.rs      - Token counters and cache
//! ├── fitter.rs      - Budget fitter
//! ├── reducers/      - One reducer per policy
//! └── rust_lang.rs, python.rs, typescript.rs, go.rs, c.rs, markup.rs
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use prompt_pack_condense::{reduce_source, LanguageId, ReductionPolicyConfig, HeuristicCounter};
//!
//! let config = ReductionPolicyConfig::from_toml_str("[comments]\nmode = \"strip_all\"")?;
//! let outcome = reduce_source(code, LanguageId::Rust, &config, &HeuristicCounter);
//! println!("{}", outcome.text);
//! ```

pub mod c;
pub mod common;
pub mod edit;
pub mod fitter;
pub mod go;
pub mod markup;
pub mod placeholder;
pub mod policy;
pub mod python;
pub mod query;
pub mod reducers;
pub mod rust_lang;
pub mod tokens;
pub mod tree;
pub mod typescript;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;
use tree_sitter::{Language, Node};

use crate::error::ReduceError;
use edit::Pass;
use fitter::{CancelToken, FitState};
use placeholder::{OmissionKind, OmissionRecord, PlaceholderSpec};
use policy::ReductionPolicyConfig;
use query::QueryTable;
use tokens::TokenCounter;
use tree::SyntaxTree;

// ============ Supported Languages ============

/// Languages with a grammar and capability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Rust,
    Python,
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Go,
    C,
    Css,
    Html,
}

impl LanguageId {
    pub const ALL: [LanguageId; 10] = [
        Self::Rust,
        Self::Python,
        Self::TypeScript,
        Self::Tsx,
        Self::JavaScript,
        Self::Jsx,
        Self::Go,
        Self::C,
        Self::Css,
        Self::Html,
    ];

    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "rs" => Some(Self::Rust),
            "py" | "pyw" | "pyi" => Some(Self::Python),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "go" => Some(Self::Go),
            "c" | "h" => Some(Self::C),
            "css" => Some(Self::Css),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Detect language from a file path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::Go => "go",
            Self::C => "c",
            Self::Css => "css",
            Self::Html => "html",
        }
    }

    /// Get the tree-sitter language for this file type
    pub fn tree_sitter_language(self) -> Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Css => tree_sitter_css::LANGUAGE.into(),
            Self::Html => tree_sitter_html::LANGUAGE.into(),
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lower)
            .or_else(|| Self::from_extension(&lower))
            .ok_or_else(|| ReduceError::invalid_config("language", format!("unknown language `{s}`")))
    }
}

// ============ Capability Records ============

/// How function bodies are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    Braces,
    Indented,
}

/// Whether an import refers to the current project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    Local,
    External,
}

/// Result of classifying a declaration for the public-API filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
    NotADeclaration,
}

/// Top-level exports of a module file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleExports {
    /// Whether the file exports anything at all.
    pub any: bool,
    /// Local names exported by an export clause or a default export.
    pub names: Vec<String>,
}

/// Context handed to a visibility classifier.
#[derive(Debug, Clone, Copy)]
pub struct ScopeInfo<'t> {
    /// The enclosing container declaration, if any.
    pub container: Option<Node<'t>>,
    /// Whether the file declares any exports.
    pub file_has_exports: bool,
    /// Names exported separately from their declaration.
    pub exported: &'t [String],
}

/// Declaration scope rules for the public-API filter.
#[derive(Clone, Copy)]
pub struct ScopeRules {
    /// Wrapper kinds and the field holding the wrapped declaration.
    pub wrappers: &'static [(&'static str, &'static str)],
    /// Container kinds and the field holding their member list.
    pub containers: &'static [(&'static str, &'static str)],
    /// Member lists not reachable through a single field.
    pub members: Option<fn(Node<'_>) -> Option<Node<'_>>>,
    /// Decorator or attribute kinds that attach to the next declaration.
    pub attached: &'static [&'static str],
    pub classify: fn(Node<'_>, &str, &ScopeInfo<'_>) -> Visibility,
    /// Singular label for a declaration kind; the flag is set for members.
    pub unit_label: fn(&str, bool) -> &'static str,
    /// Exports declared by the file. `None` means every file exports.
    pub exports: Option<fn(Node<'_>, &str) -> ModuleExports>,
}

impl ScopeRules {
    /// Follow wrapper fields down to the wrapped declaration.
    pub fn unwrap<'t>(&self, mut node: Node<'t>) -> Node<'t> {
        while let Some(&(_, field)) = self.wrappers.iter().find(|(kind, _)| *kind == node.kind()) {
            match node.child_by_field_name(field) {
                Some(inner) => node = inner,
                None => break,
            }
        }
        node
    }

    /// Member list of a container declaration.
    pub fn container_body<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        self.containers
            .iter()
            .find(|(kind, _)| *kind == node.kind())
            .and_then(|&(_, field)| node.child_by_field_name(field))
            .or_else(|| self.members.and_then(|members| members(node)))
    }
}

/// Everything reducers need to know about one language.
pub struct LanguageSpec {
    pub placeholder: PlaceholderSpec,
    pub queries: QueryTable,
    pub comment_kinds: &'static [&'static str],
    /// Node kinds that count as strippable function bodies.
    pub body_kinds: &'static [&'static str],
    pub body_style: BodyStyle,
    pub is_doc_comment: fn(Node<'_>, &str) -> bool,
    /// Locality from an import path's source text.
    pub import_locality: fn(&str) -> Locality,
    /// `None` when the language has no notion of public API.
    pub scope: Option<ScopeRules>,
}

/// Capability record for `language`.
pub fn language_spec(language: LanguageId) -> &'static LanguageSpec {
    match language {
        LanguageId::Rust => &rust_lang::SPEC,
        LanguageId::Python => &python::SPEC,
        LanguageId::TypeScript | LanguageId::Tsx | LanguageId::JavaScript | LanguageId::Jsx => &typescript::SPEC,
        LanguageId::Go => &go::SPEC,
        LanguageId::C => &c::SPEC,
        LanguageId::Css => &markup::CSS_SPEC,
        LanguageId::Html => &markup::HTML_SPEC,
    }
}

pub fn never_doc(_node: Node<'_>, _source: &str) -> bool {
    false
}

pub fn always_external(_path: &str) -> Locality {
    Locality::External
}

// ============ Result Type ============

/// Per-pass totals for one reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyStats {
    /// Omission markers (or silent removals) produced.
    pub omissions: usize,
    /// Items omitted across those records.
    pub items: usize,
    pub lines: usize,
    pub tokens_removed: usize,
}

/// Result of condensing one file.
#[derive(Debug, Clone, Serialize)]
pub struct ReducedResult {
    pub text: String,
    pub omissions: Vec<OmissionRecord>,
    pub stats: Vec<(Pass, PolicyStats)>,
    pub original_token_count: usize,
    pub final_token_count: usize,
    pub fit_state: FitState,
    /// Escalation level the output came from; 0 is the caller's config.
    pub level: usize,
    pub superseded_edits: usize,
    pub original_lines: usize,
    pub final_lines: usize,
}

impl ReducedResult {
    /// Stats for one pass, if it produced anything.
    pub fn stats_for(&self, pass: Pass) -> Option<&PolicyStats> {
        self.stats.iter().find(|(p, _)| *p == pass).map(|(_, s)| s)
    }

    /// Human-readable aggregate lines, one per kind of omission.
    pub fn summary(&self) -> Vec<String> {
        let mut groups: Vec<((OmissionKind, &'static str), usize, usize, usize, usize)> = Vec::new();
        for rec in &self.omissions {
            let key = (rec.kind, rec.unit_label);
            let tokens = rec.tokens_removed.unwrap_or(0);
            match groups.iter_mut().find(|(k, ..)| *k == key) {
                Some((_, records, items, lines, toks)) => {
                    *records += 1;
                    *items += rec.count;
                    *lines += rec.lines;
                    *toks += tokens;
                }
                None => groups.push((key, 1, rec.count, rec.lines, tokens)),
            }
        }
        groups.sort_by_key(|(key, ..)| *key);
        groups
            .into_iter()
            .map(|((kind, label), records, items, lines, tokens)| match kind {
                OmissionKind::FunctionBody => format!(
                    "{records} {} omitted ({lines} lines)",
                    common::plural(&format!("{label} body"), records)
                ),
                OmissionKind::DocTruncated => format!(
                    "{records} {} truncated ({lines} lines)",
                    common::plural("doc comment", records)
                ),
                OmissionKind::StringLiteral | OmissionKind::CollectionLiteral => format!(
                    "{records} {} trimmed ({}{tokens} tokens)",
                    common::plural(label, records),
                    placeholder::MINUS
                ),
                _ => format!("{items} {} omitted ({lines} lines)", common::plural(label, items)),
            })
            .collect()
    }

    /// Serialize for editor integrations.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ============ Main Entry Points ============

/// Reduce a parsed file under `config`.
///
/// Fails with a config error, before any edit, when `config` is invalid or
/// asks for a policy the tree's language cannot honour.
pub fn reduce(
    tree: &SyntaxTree,
    source: &str,
    config: &ReductionPolicyConfig,
    counter: &dyn TokenCounter,
) -> Result<ReducedResult, ReduceError> {
    fitter::fit(tree, source, config, counter, None)
}

/// Outcome of [`reduce_source`]: always carries usable text.
#[derive(Debug)]
pub struct Outcome {
    /// Reduced text, or the original text when reduction failed.
    pub text: String,
    pub result: Result<ReducedResult, ReduceError>,
}

impl Outcome {
    pub fn is_reduced(&self) -> bool {
        self.result.is_ok()
    }
}

/// Parse and reduce `source`, falling back to the unmodified text with a
/// diagnostic when anything goes wrong.
pub fn reduce_source(
    source: &str,
    language: LanguageId,
    config: &ReductionPolicyConfig,
    counter: &dyn TokenCounter,
) -> Outcome {
    reduce_source_with_cancel(source, language, config, counter, None)
}

pub fn reduce_source_with_cancel(
    source: &str,
    language: LanguageId,
    config: &ReductionPolicyConfig,
    counter: &dyn TokenCounter,
    cancel: Option<&CancelToken>,
) -> Outcome {
    let result = tree::parse(source, language).and_then(|tree| fitter::fit(&tree, source, config, counter, cancel));

    match result {
        Ok(reduced) => Outcome {
            text: reduced.text.clone(),
            result: Ok(reduced),
        },
        Err(err) => {
            warn!(%language, error = %err, "condensation failed, keeping original text");
            Outcome {
                text: source.to_string(),
                result: Err(err),
            }
        }
    }
}
