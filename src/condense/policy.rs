//! Reduction policy configuration.
//!
//! A [`ReductionPolicyConfig`] says which reducers run and with what
//! parameters. It deserializes from TOML with every field optional; the
//! default configuration changes nothing.
//!
//! ```toml
//! public_api_only = false
//! token_budget = 4000
//!
//! [strip_function_bodies]
//! mode = "large_only"
//! min_lines = 12
//! shape = "inside_delimiters"
//!
//! [comments]
//! mode = "keep_doc"
//!
//! [imports]
//! mode = "strip_local"
//! local_prefixes = ["@app/"]
//!
//! [literals]
//! max_tokens = 64
//! ```

use serde::{Deserialize, Serialize};

use super::{language_spec, LanguageId};
use crate::error::ReduceError;

// ============ Function Bodies ============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    #[default]
    None,
    LargeOnly,
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyShape {
    /// Keep the delimiters, replace the interior with one placeholder line.
    #[default]
    InsideDelimiters,
    /// Replace the whole body with a placeholder after the signature.
    Collapse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FunctionBodyPolicy {
    pub mode: BodyMode,
    /// Minimum body size in lines for `large_only`.
    pub min_lines: usize,
    pub shape: BodyShape,
}

impl Default for FunctionBodyPolicy {
    fn default() -> Self {
        Self {
            mode: BodyMode::None,
            min_lines: 10,
            shape: BodyShape::InsideDelimiters,
        }
    }
}

// ============ Comments ============

/// Comment handling, ordered from least to most aggressive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentMode {
    #[default]
    KeepAll,
    KeepDoc,
    KeepFirstSentence,
    StripAll,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentPolicy {
    pub mode: CommentMode,
}

// ============ Imports ============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    #[default]
    KeepAll,
    StripLocal,
    StripExternal,
    StripAll,
}

impl ImportMode {
    /// The least aggressive mode that strips everything `self` or `other`
    /// strips.
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::KeepAll, m) | (m, Self::KeepAll) => m,
            _ => Self::StripAll,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportPolicy {
    pub mode: ImportMode,
    /// Import paths starting with any of these count as local.
    pub local_prefixes: Vec<String>,
}

// ============ Literals ============

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiteralPolicy {
    /// Literals above this many tokens are trimmed. `None` disables trimming.
    pub max_tokens: Option<usize>,
}

// ============ Escalation ============

/// One tightening step of the budget fitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EscalationStep {
    Comments { mode: CommentMode },
    Imports { mode: ImportMode },
    Literals { max_tokens: usize },
    FunctionBodies { mode: BodyMode, min_lines: usize },
    PublicApi,
}

impl EscalationStep {
    /// Apply this step on top of `config`. Parameters only ever tighten: a
    /// step that would loosen something leaves it as it is.
    pub fn tighten(&self, config: &ReductionPolicyConfig) -> ReductionPolicyConfig {
        let mut next = config.clone();
        match *self {
            Self::Comments { mode } => next.comments.mode = next.comments.mode.max(mode),
            Self::Imports { mode } => next.imports.mode = next.imports.mode.union(mode),
            Self::Literals { max_tokens } => {
                next.literals.max_tokens = Some(next.literals.max_tokens.map_or(max_tokens, |m| m.min(max_tokens)));
            }
            Self::FunctionBodies { mode, min_lines } => {
                let bodies = &mut next.strip_function_bodies;
                match (bodies.mode, mode) {
                    (BodyMode::LargeOnly, BodyMode::LargeOnly) => bodies.min_lines = bodies.min_lines.min(min_lines),
                    (BodyMode::None, BodyMode::LargeOnly) => {
                        bodies.mode = BodyMode::LargeOnly;
                        bodies.min_lines = min_lines;
                    }
                    (current, target) => bodies.mode = current.max(target),
                }
            }
            Self::PublicApi => next.public_api_only = true,
        }
        next
    }

    /// True if the step can take effect for `language`.
    pub fn supported_by(&self, language: LanguageId) -> bool {
        match self {
            Self::PublicApi => language_spec(language).scope.is_some(),
            _ => true,
        }
    }
}

/// The schedule used when a config sets a budget but no escalation list.
pub fn default_escalation() -> Vec<EscalationStep> {
    vec![
        EscalationStep::Comments {
            mode: CommentMode::KeepDoc,
        },
        EscalationStep::Literals { max_tokens: 64 },
        EscalationStep::Imports {
            mode: ImportMode::StripExternal,
        },
        EscalationStep::FunctionBodies {
            mode: BodyMode::LargeOnly,
            min_lines: 20,
        },
        EscalationStep::FunctionBodies {
            mode: BodyMode::LargeOnly,
            min_lines: 8,
        },
        EscalationStep::Comments {
            mode: CommentMode::KeepFirstSentence,
        },
        EscalationStep::Literals { max_tokens: 16 },
        EscalationStep::FunctionBodies {
            mode: BodyMode::All,
            min_lines: 1,
        },
        EscalationStep::Comments {
            mode: CommentMode::StripAll,
        },
        EscalationStep::Imports {
            mode: ImportMode::StripAll,
        },
        EscalationStep::PublicApi,
    ]
}

// ============ Config ============

/// Which reducers run and their parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionPolicyConfig {
    pub strip_function_bodies: FunctionBodyPolicy,
    pub public_api_only: bool,
    pub comments: CommentPolicy,
    pub imports: ImportPolicy,
    pub literals: LiteralPolicy,
    /// Target token count. `None` runs the configured policies once.
    pub token_budget: Option<usize>,
    /// Escalation steps for the budget fitter. `None` uses
    /// [`default_escalation`].
    pub escalation: Option<Vec<EscalationStep>>,
}

impl ReductionPolicyConfig {
    /// Load a config from a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ReduceError> {
        toml::from_str(text).map_err(|e| ReduceError::ConfigLoad { message: e.to_string() })
    }

    /// Escalation steps in effect.
    pub fn escalation_steps(&self) -> Vec<EscalationStep> {
        self.escalation.clone().unwrap_or_else(default_escalation)
    }

    /// Check thresholds and language support before any edit is made.
    pub fn validate(&self, language: LanguageId) -> Result<(), ReduceError> {
        let bodies = &self.strip_function_bodies;
        if bodies.mode == BodyMode::LargeOnly && bodies.min_lines == 0 {
            return Err(ReduceError::invalid_config(
                "strip_function_bodies.min_lines",
                "must be at least 1",
            ));
        }
        if self.literals.max_tokens == Some(0) {
            return Err(ReduceError::invalid_config("literals.max_tokens", "must be at least 1"));
        }
        if self.token_budget == Some(0) {
            return Err(ReduceError::invalid_config("token_budget", "must be at least 1"));
        }
        if self.imports.local_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ReduceError::invalid_config(
                "imports.local_prefixes",
                "prefixes must not be empty",
            ));
        }
        for step in self.escalation.iter().flatten() {
            match step {
                EscalationStep::Literals { max_tokens: 0 } => {
                    return Err(ReduceError::invalid_config(
                        "escalation.max_tokens",
                        "must be at least 1",
                    ));
                }
                EscalationStep::FunctionBodies {
                    mode: BodyMode::LargeOnly,
                    min_lines: 0,
                } => {
                    return Err(ReduceError::invalid_config(
                        "escalation.min_lines",
                        "must be at least 1",
                    ));
                }
                _ => {}
            }
        }
        if self.public_api_only && language_spec(language).scope.is_none() {
            return Err(ReduceError::unsupported_policy("public_api_only", language));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_noop() {
        let config = ReductionPolicyConfig::default();
        assert_eq!(config.strip_function_bodies.mode, BodyMode::None);
        assert_eq!(config.comments.mode, CommentMode::KeepAll);
        assert_eq!(config.imports.mode, ImportMode::KeepAll);
        assert!(config.literals.max_tokens.is_none());
        assert!(!config.public_api_only);
        assert!(config.validate(LanguageId::Rust).is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = ReductionPolicyConfig::from_toml_str(
            r#"
token_budget = 4000

[strip_function_bodies]
mode = "large_only"
min_lines = 12
shape = "collapse"

[imports]
mode = "strip_local"
local_prefixes = ["@app/"]

[[escalation]]
policy = "literals"
max_tokens = 32

[[escalation]]
policy = "public_api"
"#,
        )
        .unwrap();
        assert_eq!(config.token_budget, Some(4000));
        assert_eq!(config.strip_function_bodies.min_lines, 12);
        assert_eq!(config.strip_function_bodies.shape, BodyShape::Collapse);
        assert_eq!(config.imports.local_prefixes, vec!["@app/".to_string()]);
        assert_eq!(
            config.escalation_steps(),
            vec![EscalationStep::Literals { max_tokens: 32 }, EscalationStep::PublicApi]
        );
    }

    #[test]
    fn test_unknown_keys_are_load_errors() {
        let err = ReductionPolicyConfig::from_toml_str("strip_everything = true").unwrap_err();
        assert!(matches!(err, ReduceError::ConfigLoad { .. }));
    }

    #[test]
    fn test_validate_thresholds() {
        let mut config = ReductionPolicyConfig::default();
        config.strip_function_bodies.mode = BodyMode::LargeOnly;
        config.strip_function_bodies.min_lines = 0;
        let err = config.validate(LanguageId::Go).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::InvalidConfig {
                field: "strip_function_bodies.min_lines",
                ..
            }
        ));

        let config = ReductionPolicyConfig {
            literals: LiteralPolicy { max_tokens: Some(0) },
            ..Default::default()
        };
        assert!(config.validate(LanguageId::Python).is_err());
    }

    #[test]
    fn test_public_api_unsupported_for_markup() {
        let config = ReductionPolicyConfig {
            public_api_only: true,
            ..Default::default()
        };
        assert!(config.validate(LanguageId::Rust).is_ok());
        let err = config.validate(LanguageId::Css).unwrap_err();
        assert!(matches!(err, ReduceError::UnsupportedPolicy { .. }));
    }

    #[test]
    fn test_steps_only_tighten() {
        let mut config = ReductionPolicyConfig::default();
        config.comments.mode = CommentMode::StripAll;
        config.strip_function_bodies.mode = BodyMode::LargeOnly;
        config.strip_function_bodies.min_lines = 5;
        config.literals.max_tokens = Some(8);

        let next = EscalationStep::Comments {
            mode: CommentMode::KeepDoc,
        }
        .tighten(&config);
        assert_eq!(next.comments.mode, CommentMode::StripAll);

        let next = EscalationStep::FunctionBodies {
            mode: BodyMode::LargeOnly,
            min_lines: 20,
        }
        .tighten(&config);
        assert_eq!(next.strip_function_bodies.min_lines, 5);

        let next = EscalationStep::Literals { max_tokens: 64 }.tighten(&config);
        assert_eq!(next.literals.max_tokens, Some(8));

        let next = EscalationStep::Imports {
            mode: ImportMode::StripLocal,
        }
        .tighten(&config);
        let next = EscalationStep::Imports {
            mode: ImportMode::StripExternal,
        }
        .tighten(&next);
        assert_eq!(next.imports.mode, ImportMode::StripAll);
    }

    #[test]
    fn test_default_schedule_ends_at_strictest() {
        let mut config = ReductionPolicyConfig::default();
        for step in default_escalation() {
            config = step.tighten(&config);
        }
        assert_eq!(config.comments.mode, CommentMode::StripAll);
        assert_eq!(config.imports.mode, ImportMode::StripAll);
        assert_eq!(config.strip_function_bodies.mode, BodyMode::All);
        assert_eq!(config.literals.max_tokens, Some(16));
        assert!(config.public_api_only);
    }
}
