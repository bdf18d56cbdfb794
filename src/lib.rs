//! Token-budget-aware structural condensation of source files.
//!
//! Source files are parsed with tree-sitter and shrunk by policy: function
//! bodies, private declarations, comments, imports and oversized literals are
//! replaced with comment markers that say what was removed. With a token
//! budget the policies escalate until the file fits.

pub mod condense;
pub mod error;


use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

pub use condense::edit::Pass;
pub use condense::fitter::{CancelToken, FitState};
pub use condense::placeholder::{OmissionKind, OmissionRecord};
pub use condense::policy::{
    BodyMode, BodyShape, CommentMode, EscalationStep, ImportMode, ReductionPolicyConfig,
};
pub use condense::tokens::{HeuristicCounter, TiktokenCounter, TokenCache, TokenCounter};
pub use condense::tree::{parse, SyntaxTree};
pub use condense::{reduce, reduce_source, reduce_source_with_cancel, LanguageId, Outcome, PolicyStats, ReducedResult};
pub use error::ReduceError;

// ============ Batch Processing ============

/// One file to condense.
#[derive(Debug, Clone)]
pub struct FileJob {
    pub path: PathBuf,
    pub source: String,
    pub language: LanguageId,
}

impl FileJob {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>, language: LanguageId) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            language,
        }
    }

    /// Read a file and detect its language from the extension.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ReduceError> {
        let path = path.as_ref();
        let language = LanguageId::from_path(path).ok_or_else(|| ReduceError::UnknownLanguage {
            path: path.to_path_buf(),
        })?;
        let source = std::fs::read_to_string(path).map_err(|source| ReduceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, source, language))
    }
}

/// Result for one file of a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// Condense many files in parallel.
///
/// Files are independent: a failure falls back to that file's original text
/// and never affects the others. Cancelling `cancel` abandons every file that
/// has not finished yet.
pub fn reduce_batch(
    jobs: &[FileJob],
    config: &ReductionPolicyConfig,
    counter: &dyn TokenCounter,
    cancel: Option<&CancelToken>,
) -> Vec<FileOutcome> {
    debug!(files = jobs.len(), "condensing batch");
    jobs.par_iter()
        .map(|job| FileOutcome {
            path: job.path.clone(),
            outcome: reduce_source_with_cancel(&job.source, job.language, config, counter, cancel),
        })
        .collect()
}
