//! Budget fitter.
//!
//! Level 0 runs the caller's config. When a token budget is set, each
//! further level applies one escalation step on top of the previous level
//! and is reduced from the original text again. The first level whose
//! output fits wins; otherwise the smallest output seen is returned as
//! [`FitState::Exhausted`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::edit::{AppliedEdits, Pass};
use super::policy::ReductionPolicyConfig;
use super::reducers::run_passes;
use super::tokens::TokenCounter;
use super::tree::SyntaxTree;
use super::{LanguageId, PolicyStats, ReducedResult};
use crate::error::ReduceError;

// ============ Types ============

/// Terminal state of the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitState {
    /// The output is within budget, or no budget was set.
    Fits,
    /// Every level ran and none fit; the smallest output was kept.
    Exhausted,
}

/// Cooperative cancellation flag, checked between levels.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct Candidate {
    level: usize,
    tokens: usize,
    applied: AppliedEdits,
}

// ============ Levels ============

/// Policy configs for every level, starting with `config` itself.
///
/// Steps the language cannot honour and steps that leave the config
/// unchanged do not produce a level.
pub fn levels(config: &ReductionPolicyConfig, language: LanguageId) -> Vec<ReductionPolicyConfig> {
    let mut levels = vec![config.clone()];
    if config.token_budget.is_none() {
        return levels;
    }
    for step in config.escalation_steps() {
        if !step.supported_by(language) {
            debug!(?step, %language, "escalation step unsupported, skipped");
            continue;
        }
        let Some(previous) = levels.last() else {
            break;
        };
        let next = step.tighten(previous);
        if &next != previous {
            levels.push(next);
        }
    }
    levels
}

// ============ Fitting ============

/// Reduce `source` under `config`, escalating until the token budget is met.
///
/// The config is validated for the tree's language before any edit is made.
pub fn fit(
    tree: &SyntaxTree,
    source: &str,
    config: &ReductionPolicyConfig,
    counter: &dyn TokenCounter,
    cancel: Option<&CancelToken>,
) -> Result<ReducedResult, ReduceError> {
    config.validate(tree.language())?;
    let cancelled = || cancel.is_some_and(CancelToken::is_cancelled);
    let original_tokens = counter.count_tokens(source);
    let budget = config.token_budget;
    let fits = |tokens: usize| budget.map_or(true, |b| tokens <= b);
    let levels = levels(config, tree.language());

    if cancelled() {
        return Err(ReduceError::Cancelled);
    }
    let applied = run_passes(tree, source, &levels[0], counter)?;
    let mut best = Candidate {
        level: 0,
        tokens: counter.count_tokens(&applied.text),
        applied,
    };
    debug!(level = 0, tokens = best.tokens, ?budget, original_tokens, "policies applied");
    if fits(best.tokens) {
        return Ok(finish(source, best, original_tokens, FitState::Fits, counter));
    }

    for (level, level_config) in levels.iter().enumerate().skip(1) {
        if cancelled() {
            debug!(level, "fitting cancelled");
            return Err(ReduceError::Cancelled);
        }
        let applied = run_passes(tree, source, level_config, counter)?;
        let tokens = counter.count_tokens(&applied.text);
        if tokens >= best.tokens {
            debug!(level, tokens, best = best.tokens, "level not smaller than best, skipped");
            continue;
        }
        debug!(level, tokens, ?budget, "escalated");
        best = Candidate { level, tokens, applied };
        if fits(tokens) {
            return Ok(finish(source, best, original_tokens, FitState::Fits, counter));
        }
    }

    debug!(level = best.level, tokens = best.tokens, ?budget, "escalation exhausted");
    Ok(finish(source, best, original_tokens, FitState::Exhausted, counter))
}

fn finish(
    source: &str,
    best: Candidate,
    original_token_count: usize,
    fit_state: FitState,
    counter: &dyn TokenCounter,
) -> ReducedResult {
    let Candidate { level, tokens, applied } = best;
    let mut omissions = Vec::new();
    let mut stats: Vec<(Pass, PolicyStats)> = Vec::new();

    for edit in &applied.accepted {
        let removed = counter
            .count_tokens(&source[edit.start..edit.end])
            .saturating_sub(counter.count_tokens(&edit.replacement));
        let entry = match stats.iter().position(|(pass, _)| *pass == edit.pass) {
            Some(idx) => &mut stats[idx].1,
            None => {
                stats.push((edit.pass, PolicyStats::default()));
                let last = stats.len() - 1;
                &mut stats[last].1
            }
        };
        entry.tokens_removed += removed;
        if let Some(record) = &edit.omission {
            entry.omissions += 1;
            entry.items += record.count;
            entry.lines += record.lines;
            let record = match record.tokens_removed {
                Some(_) => record.clone(),
                None => record.clone().with_tokens(removed),
            };
            omissions.push(record);
        }
    }
    stats.sort_by_key(|(pass, _)| *pass);

    ReducedResult {
        text: applied.text,
        omissions,
        stats,
        original_token_count,
        final_token_count: tokens,
        fit_state,
        level,
        superseded_edits: applied.superseded.len(),
        original_lines: applied.lines_before,
        final_lines: applied.lines_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condense::policy::{CommentMode, EscalationStep};
    use crate::condense::tree::parse;

    /// One token per whitespace-separated word.
    struct Words;

    impl TokenCounter for Words {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    const SOURCE: &str = "\
// Helper module with a long explanatory comment that goes on and on.
// It keeps going for a second line of prose.
pub fn compute(a: i32, b: i32) -> i32 {
    let sum = a + b;
    let product = a * b;
    let difference = a - b;
    sum + product + difference
}

fn private_helper() -> i32 {
    let value = 42;
    value * 2
}
";

    fn budget(tokens: usize) -> ReductionPolicyConfig {
        ReductionPolicyConfig {
            token_budget: Some(tokens),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_budget_runs_once() {
        let tree = parse(SOURCE, LanguageId::Rust).unwrap();
        let result = fit(&tree, SOURCE, &ReductionPolicyConfig::default(), &Words, None).unwrap();
        assert_eq!(result.text, SOURCE);
        assert_eq!(result.level, 0);
        assert_eq!(result.fit_state, FitState::Fits);
        assert_eq!(result.final_token_count, result.original_token_count);
        assert!(result.omissions.is_empty());
    }

    #[test]
    fn test_escalates_until_fit() {
        let tree = parse(SOURCE, LanguageId::Rust).unwrap();
        let original = Words.count_tokens(SOURCE);
        let result = fit(&tree, SOURCE, &budget(original - 20), &Words, None).unwrap();
        assert_eq!(result.fit_state, FitState::Fits);
        assert!(result.level > 0);
        assert!(result.final_token_count <= original - 20);
        assert_eq!(result.final_token_count, Words.count_tokens(&result.text));
    }

    #[test]
    fn test_unreachable_budget_exhausts() {
        let tree = parse(SOURCE, LanguageId::Rust).unwrap();
        let result = fit(&tree, SOURCE, &budget(1), &Words, None).unwrap();
        assert_eq!(result.fit_state, FitState::Exhausted);
        assert!(result.final_token_count < result.original_token_count);
        assert!(result.text.contains("pub fn compute(a: i32, b: i32) -> i32"));
        assert!(!result.text.contains("private_helper"));
    }

    #[test]
    fn test_cancelled_before_first_level() {
        let tree = parse(SOURCE, LanguageId::Rust).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = fit(&tree, SOURCE, &budget(1), &Words, Some(&token)).unwrap_err();
        assert!(matches!(err, ReduceError::Cancelled));
    }

    #[test]
    fn test_invalid_config_rejected_before_reducing() {
        let tree = parse(SOURCE, LanguageId::Rust).unwrap();
        let err = fit(&tree, SOURCE, &budget(0), &Words, None).unwrap_err();
        assert!(matches!(err, ReduceError::InvalidConfig { .. }));
    }

    #[test]
    fn test_levels_skip_noop_and_unsupported_steps() {
        let mut config = budget(10);
        config.escalation = Some(vec![
            EscalationStep::Comments {
                mode: CommentMode::StripAll,
            },
            EscalationStep::Comments {
                mode: CommentMode::KeepDoc,
            },
            EscalationStep::PublicApi,
        ]);
        assert_eq!(levels(&config, LanguageId::Rust).len(), 3);
        assert_eq!(levels(&config, LanguageId::Css).len(), 2);
        assert_eq!(levels(&ReductionPolicyConfig::default(), LanguageId::Rust).len(), 1);
    }

    #[test]
    fn test_stats_match_omissions() {
        let tree = parse(SOURCE, LanguageId::Rust).unwrap();
        let mut config = ReductionPolicyConfig::default();
        config.comments.mode = CommentMode::StripAll;
        let result = fit(&tree, SOURCE, &config, &Words, None).unwrap();
        let stats = result.stats_for(Pass::Comments).unwrap();
        assert_eq!(stats.omissions, 1);
        assert_eq!(stats.items, 2);
        assert_eq!(stats.lines, 2);
        assert!(stats.tokens_removed > 0);
        assert_eq!(result.omissions[0].tokens_removed, Some(stats.tokens_removed));
    }
}
