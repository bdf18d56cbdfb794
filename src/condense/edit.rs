//! Range edit buffer.
//!
//! Reducers register byte-range edits against the original, immutable source
//! text. [`EditBuffer::apply`] validates them, resolves overlaps between
//! passes and produces the new text in a single forward pass.

use std::cmp::Reverse;

use serde::Serialize;
use tracing::trace;

use super::common::count_lines;
use super::placeholder::OmissionRecord;
use crate::error::ReduceError;

// ============ Passes ============

/// Reducer passes in precedence order: later passes win overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Comments,
    Imports,
    Literals,
    FunctionBodies,
    PublicApi,
}

impl Pass {
    pub const ALL: [Pass; 5] = [
        Pass::Comments,
        Pass::Imports,
        Pass::Literals,
        Pass::FunctionBodies,
        Pass::PublicApi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Pass::Comments => "comments",
            Pass::Imports => "imports",
            Pass::Literals => "literals",
            Pass::FunctionBodies => "function_bodies",
            Pass::PublicApi => "public_api",
        }
    }
}

// ============ Edits ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Delete,
    Replace,
    Insert,
}

/// A replacement of `start..end` in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    pub kind: EditKind,
    pub pass: Pass,
    /// What this edit reports as omitted, if anything.
    pub omission: Option<OmissionRecord>,
}

impl Edit {
    /// Build an edit; the kind follows from the range and replacement.
    pub fn new(start: usize, end: usize, replacement: impl Into<String>, pass: Pass) -> Self {
        let replacement = replacement.into();
        let kind = if start == end {
            EditKind::Insert
        } else if replacement.is_empty() {
            EditKind::Delete
        } else {
            EditKind::Replace
        };
        Self {
            start,
            end,
            replacement,
            kind,
            pass,
            omission: None,
        }
    }

    pub fn delete(start: usize, end: usize, pass: Pass) -> Self {
        Self::new(start, end, String::new(), pass)
    }

    pub fn insert(at: usize, text: impl Into<String>, pass: Pass) -> Self {
        Self::new(at, at, text, pass)
    }

    #[must_use]
    pub fn with_omission(mut self, omission: OmissionRecord) -> Self {
        self.omission = Some(omission);
        self
    }

    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if applying both edits would touch the same bytes. An insertion
    /// conflicts only with a range strictly surrounding its position.
    fn overlaps(&self, other: &Edit) -> bool {
        match (self.len(), other.len()) {
            (0, 0) => false,
            (0, _) => other.start < self.start && self.start < other.end,
            (_, 0) => self.start < other.start && other.start < self.end,
            _ => self.start < other.end && other.start < self.end,
        }
    }

    fn contains(&self, other: &Edit) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// An edit that lost an overlap to a higher-precedence or enclosing edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superseded {
    pub edit: Edit,
    pub by: (usize, usize),
    pub by_pass: Pass,
}

/// Result of applying an edit buffer.
#[derive(Debug, Clone)]
pub struct AppliedEdits {
    pub text: String,
    /// Accepted edits in source order.
    pub accepted: Vec<Edit>,
    pub superseded: Vec<Superseded>,
    pub lines_before: usize,
    pub lines_after: usize,
}

impl AppliedEdits {
    pub fn omissions(&self) -> impl Iterator<Item = &OmissionRecord> + '_ {
        self.accepted.iter().filter_map(|e| e.omission.as_ref())
    }
}

// ============ Buffer ============

/// Collects edits against one source text.
#[derive(Debug)]
pub struct EditBuffer<'src> {
    source: &'src str,
    edits: Vec<Edit>,
}

impl<'src> EditBuffer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    pub fn add(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Non-empty spans already claimed by edits of `pass`.
    pub fn spans_of(&self, pass: Pass) -> Vec<(usize, usize)> {
        self.edits
            .iter()
            .filter(|e| e.pass == pass && e.start < e.end)
            .map(Edit::range)
            .collect()
    }

    /// Validate, resolve overlaps and apply every edit.
    ///
    /// Edits are accepted greedily from the highest pass down, longest span
    /// first within a pass. An edit overlapping an accepted edit from a later
    /// pass, or nested inside one from its own pass, is superseded. Partial
    /// overlaps within one pass are a reducer bug and fail the whole apply.
    pub fn apply(self) -> Result<AppliedEdits, ReduceError> {
        let source = self.source;
        for edit in &self.edits {
            validate(source, edit)?;
        }

        let mut order: Vec<usize> = (0..self.edits.len()).collect();
        order.sort_by_key(|&i| {
            let e = &self.edits[i];
            (Reverse(e.pass), Reverse(e.len()), e.start, i)
        });

        let mut accepted: Vec<usize> = Vec::with_capacity(order.len());
        let mut superseded = Vec::new();
        for idx in order {
            let candidate = &self.edits[idx];
            let winner = accepted.iter().map(|&a| &self.edits[a]).find(|a| a.overlaps(candidate));
            match winner {
                None => accepted.push(idx),
                Some(winner) if winner.pass == candidate.pass && !winner.contains(candidate) => {
                    return Err(ReduceError::EditConflict {
                        pass: candidate.pass.as_str(),
                        first: winner.range(),
                        second: candidate.range(),
                    });
                }
                Some(winner) => {
                    trace!(
                        pass = candidate.pass.as_str(),
                        start = candidate.start,
                        end = candidate.end,
                        by = winner.pass.as_str(),
                        "edit superseded"
                    );
                    superseded.push(Superseded {
                        edit: candidate.clone(),
                        by: winner.range(),
                        by_pass: winner.pass,
                    });
                }
            }
        }

        accepted.sort_by_key(|&i| (self.edits[i].start, self.edits[i].end, i));

        let mut text = String::with_capacity(source.len());
        let mut cursor = 0;
        for &i in &accepted {
            let edit = &self.edits[i];
            text.push_str(&source[cursor..edit.start]);
            text.push_str(&edit.replacement);
            cursor = cursor.max(edit.end);
        }
        text.push_str(&source[cursor..]);

        let lines_after = count_lines(&text);
        let mut edits = self.edits;
        let mut keep = vec![false; edits.len()];
        for &i in &accepted {
            keep[i] = true;
        }
        let mut flagged = keep.into_iter();
        edits.retain(|_| flagged.next().unwrap_or(false));
        edits.sort_by_key(|e| (e.start, e.end));

        Ok(AppliedEdits {
            text,
            accepted: edits,
            superseded,
            lines_before: count_lines(source),
            lines_after,
        })
    }
}

fn validate(source: &str, edit: &Edit) -> Result<(), ReduceError> {
    let len = source.len();
    let fail = |reason| Err(ReduceError::invalid_edit(edit.start, edit.end, len, reason));
    if edit.start > edit.end {
        return fail("inverted range");
    }
    if edit.end > len {
        return fail("end past buffer");
    }
    if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
        return fail("splits a character");
    }
    Ok(())
}
