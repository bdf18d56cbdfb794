//! Token counting.
//!
//! Reducers and the budget fitter only see the [`TokenCounter`] trait.
//! [`TiktokenCounter`] wraps a tiktoken BPE; [`HeuristicCounter`] estimates
//! from character counts when no tokenizer is wanted.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use tiktoken_rs::{cl100k_base, get_bpe_from_model, o200k_base, p50k_base, r50k_base, CoreBPE};

use crate::error::ReduceError;

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

// ============ Cache ============

/// Bounded token-count cache shared by the counters of one batch.
///
/// Keys include the encoding name, so one cache can serve counters for
/// different models without mixing their counts.
#[derive(Debug)]
pub struct TokenCache {
    entries: Mutex<LruCache<u64, usize>>,
}

impl TokenCache {
    pub const DEFAULT_CAPACITY: usize = 16_384;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn key(encoding: &str, text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        encoding.hash(&mut hasher);
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Cached count for `text`, computing and storing it on a miss.
    pub fn get_or_count(&self, encoding: &str, text: &str, count: impl FnOnce(&str) -> usize) -> usize {
        let key = Self::key(encoding, text);
        if let Some(&hit) = self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return hit;
        }
        let tokens = count(text);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, tokens);
        tokens
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

// ============ Tiktoken ============

/// Exact counts from a tiktoken BPE.
pub struct TiktokenCounter {
    encoding: String,
    bpe: CoreBPE,
    cache: Option<Arc<TokenCache>>,
}

impl TiktokenCounter {
    /// Create a counter for a model name ("gpt-4o") or encoding name
    /// ("cl100k_base", "o200k_base").
    pub fn new(model_or_encoding: &str) -> Result<Self, ReduceError> {
        let lower = model_or_encoding.to_ascii_lowercase();
        let bpe = match get_bpe_from_model(&lower) {
            Ok(bpe) => bpe,
            Err(_) => match lower.as_str() {
                "o200k_base" => o200k_base(),
                "cl100k_base" => cl100k_base(),
                "p50k_base" => p50k_base(),
                "r50k_base" => r50k_base(),
                _ => {
                    return Err(ReduceError::tokenizer(format!(
                        "unsupported model or encoding `{model_or_encoding}`"
                    )))
                }
            }
            .map_err(|e| ReduceError::tokenizer(e.to_string()))?,
        };
        Ok(Self {
            encoding: lower,
            bpe,
            cache: None,
        })
    }

    /// Share `cache` with other counters of the same batch.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    fn encode_len(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("encoding", &self.encoding)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match &self.cache {
            Some(cache) => cache.get_or_count(&self.encoding, text, |t| self.encode_len(t)),
            None => self.encode_len(text),
        }
    }
}

// ============ Heuristic ============

/// Roughly four characters per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}
