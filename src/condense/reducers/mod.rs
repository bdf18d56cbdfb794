//! Per-policy reducers.
//!
//! Each reducer reads the immutable tree and registers edits against the
//! original source. Reducers never see each other's output: overlaps are
//! settled by the edit buffer using pass precedence. Higher passes register
//! first, so a lower pass can keep its edits from straddling their spans.

pub mod comments;
pub mod functions;
pub mod imports;
pub mod literals;
pub mod public_api;

use tree_sitter::Node;

use super::common::{line_number, LineEnding};
use super::edit::{AppliedEdits, EditBuffer, Pass};
use super::placeholder::Location;
use super::policy::ReductionPolicyConfig;
use super::query::{self, Capture, QueryName};
use super::tokens::TokenCounter;
use super::tree::SyntaxTree;
use super::{language_spec, LanguageSpec};
use crate::error::ReduceError;

/// Shared, read-only inputs of one reduction level.
pub struct ReduceContext<'a> {
    pub tree: &'a SyntaxTree,
    pub source: &'a str,
    pub spec: &'static LanguageSpec,
    pub config: &'a ReductionPolicyConfig,
    pub counter: &'a dyn TokenCounter,
    pub line_ending: LineEnding,
}

impl<'a> ReduceContext<'a> {
    pub fn new(
        tree: &'a SyntaxTree,
        source: &'a str,
        config: &'a ReductionPolicyConfig,
        counter: &'a dyn TokenCounter,
    ) -> Self {
        Self {
            tree,
            source,
            spec: language_spec(tree.language()),
            config,
            counter,
            line_ending: LineEnding::detect(source),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.source.as_bytes()
    }

    pub fn captures(&self, name: QueryName) -> Vec<Capture<'a>> {
        query::run(self.spec.queries.patterns(name), self.tree.root(), self.bytes())
    }

    pub fn text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    pub fn location(&self, start: usize, end: usize) -> Location {
        Location {
            start_byte: start,
            end_byte: end,
            line: line_number(self.source, start),
        }
    }

    pub fn is_comment(&self, node: Node<'_>) -> bool {
        self.spec.comment_kinds.contains(&node.kind())
    }
}

/// One policy pass.
pub trait Reducer: Sync {
    fn pass(&self) -> Pass;

    fn is_active(&self, config: &ReductionPolicyConfig) -> bool;

    fn reduce(&self, ctx: &ReduceContext<'_>, buffer: &mut EditBuffer<'_>) -> Result<(), ReduceError>;
}

/// Every reducer, in precedence order.
pub fn pipeline() -> [&'static dyn Reducer; 5] {
    [
        &comments::CommentReducer,
        &imports::ImportReducer,
        &literals::LiteralReducer,
        &functions::FunctionBodyReducer,
        &public_api::PublicApiReducer,
    ]
}

/// Run every active reducer for `config`, highest pass first, and apply the
/// combined edits.
pub fn run_passes(
    tree: &SyntaxTree,
    source: &str,
    config: &ReductionPolicyConfig,
    counter: &dyn TokenCounter,
) -> Result<AppliedEdits, ReduceError> {
    let ctx = ReduceContext::new(tree, source, config, counter);
    let mut buffer = EditBuffer::new(source);
    for reducer in pipeline().into_iter().rev() {
        if reducer.is_active(config) {
            reducer.reduce(&ctx, &mut buffer)?;
        }
    }
    buffer.apply()
}
