//! Deduplicated, rankable collection of suggestions for one job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Suggestion, SuggestionKind};

/// Errors from suggestion aggregation.
#[derive(Error, Debug)]
pub enum SuggestionError {
    /// A suggestion with the same `(kind, source stage)` pair was already
    /// recorded. Recoverable: the caller drops the duplicate and continues.
    #[error("duplicate suggestion ({kind}, stage '{stage}')")]
    Duplicate {
        kind: SuggestionKind,
        stage: String,
    },

    /// The set is frozen (owning job reached a terminal state).
    #[error("suggestion set is frozen and can no longer be modified")]
    Immutable,
}

/// Result type for suggestion operations.
pub type SuggestionResult<T> = Result<T, SuggestionError>;

/// Append-only suggestion collection attached to one job.
///
/// Stored order is insertion order (stage completion order), never
/// confidence order; `rank` produces a sorted view without mutating the
/// stored sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionSet {
    items: Vec<Suggestion>,
    #[serde(skip)]
    frozen: bool,
}

impl SuggestionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a suggestion.
    ///
    /// Rejects a `(kind, source stage)` pair that was already recorded,
    /// preventing double-counting on stage retries.
    pub fn add(&mut self, suggestion: Suggestion) -> SuggestionResult<()> {
        if self.frozen {
            return Err(SuggestionError::Immutable);
        }
        if self
            .items
            .iter()
            .any(|s| s.kind == suggestion.kind && s.source_stage == suggestion.source_stage)
        {
            return Err(SuggestionError::Duplicate {
                kind: suggestion.kind,
                stage: suggestion.source_stage,
            });
        }
        self.items.push(suggestion);
        Ok(())
    }

    /// Suggestions in insertion order.
    pub fn items(&self) -> &[Suggestion] {
        &self.items
    }

    /// Number of suggestions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Suggestions ordered by descending confidence, ties broken by
    /// insertion order (stable sort). Used for display priority.
    pub fn rank(&self) -> Vec<&Suggestion> {
        let mut ranked: Vec<&Suggestion> = self.items.iter().collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }

    /// Iterate suggestions of one kind, in insertion order.
    pub fn for_kind(&self, kind: SuggestionKind) -> impl Iterator<Item = &Suggestion> {
        self.items.iter().filter(move |s| s.kind == kind)
    }

    /// Whether the set has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze the set. Called by the owning job on terminal transition.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}
