//! Error types for the condensation engine.
//!
//! Query gaps and an unreachable token budget are not errors; they are
//! absorbed by the reducers and reported through [`FitState`].
//!
//! [`FitState`]: crate::condense::fitter::FitState

use std::path::PathBuf;

use thiserror::Error;

use crate::condense::LanguageId;

/// Errors raised while condensing a single file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReduceError {
    /// A policy parameter is out of range.
    #[error("invalid configuration for `{field}`: {message}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A policy was requested for a language that cannot support it.
    #[error("policy `{policy}` is not supported for {language}")]
    UnsupportedPolicy {
        /// Name of the policy.
        policy: &'static str,
        /// Language the policy was requested for.
        language: LanguageId,
    },

    /// The configuration document could not be decoded.
    #[error("failed to load configuration: {message}")]
    ConfigLoad {
        /// Decoder message.
        message: String,
    },

    /// The parser could not produce a tree for the source.
    #[error("failed to parse {language}: {message}")]
    Parse {
        /// Language being parsed.
        language: LanguageId,
        /// Description of the failure.
        message: String,
    },

    /// An edit range is inverted, out of bounds or splits a character.
    #[error("invalid edit {start}..{end} on buffer of {len} bytes: {reason}")]
    InvalidEdit {
        /// Start offset of the edit.
        start: usize,
        /// End offset of the edit.
        end: usize,
        /// Length of the buffer.
        len: usize,
        /// Which rule the range violates.
        reason: &'static str,
    },

    /// Two edits from the same reducer pass partially overlap.
    #[error("conflicting {pass} edits at {first:?} and {second:?}")]
    EditConflict {
        /// Pass that produced both edits.
        pass: &'static str,
        /// First edit range.
        first: (usize, usize),
        /// Second edit range.
        second: (usize, usize),
    },

    /// The token counter could not be constructed.
    #[error("tokenizer unavailable: {message}")]
    Tokenizer {
        /// Description of the failure.
        message: String,
    },

    /// A batch input could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No grammar is registered for the file's extension.
    #[error("no supported language for {}", path.display())]
    UnknownLanguage {
        /// File without a recognised extension.
        path: PathBuf,
    },

    /// Processing was cancelled by the caller.
    #[error("condensation cancelled")]
    Cancelled,
}

impl ReduceError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    /// Creates an unsupported policy error.
    #[must_use]
    pub const fn unsupported_policy(policy: &'static str, language: LanguageId) -> Self {
        Self::UnsupportedPolicy { policy, language }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(language: LanguageId, message: impl Into<String>) -> Self {
        Self::Parse {
            language,
            message: message.into(),
        }
    }

    /// Creates an invalid edit error.
    #[must_use]
    pub const fn invalid_edit(start: usize, end: usize, len: usize, reason: &'static str) -> Self {
        Self::InvalidEdit {
            start,
            end,
            len,
            reason,
        }
    }

    /// Creates a tokenizer error.
    #[must_use]
    pub fn tokenizer(message: impl Into<String>) -> Self {
        Self::Tokenizer {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate a bug in a reducer rather than
    /// bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InvalidEdit { .. } | Self::EditConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(ReduceError::invalid_edit(4, 2, 10, "inverted range").is_internal());
        assert!(!ReduceError::Cancelled.is_internal());
        assert!(!ReduceError::parse(LanguageId::Rust, "boom").is_internal());
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = ReduceError::unsupported_policy("public_api_only", LanguageId::Css);
        assert_eq!(err.to_string(), "policy `public_api_only` is not supported for css");

        let err = ReduceError::invalid_edit(3, 40, 12, "end past buffer");
        assert_eq!(
            err.to_string(),
            "invalid edit 3..40 on buffer of 12 bytes: end past buffer"
        );
    }
}
