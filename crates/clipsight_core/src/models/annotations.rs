//! Annotation value types: timeline segments and improvement suggestions.

use serde::{Deserialize, Serialize};

use super::enums::{SegmentKind, SuggestionKind};

/// Identifier assigned to a segment when it is inserted into an index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seg-{}", self.0)
    }
}

/// A candidate segment offered by an analyzer, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDraft {
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    /// Classification of the range.
    pub kind: SegmentKind,
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable label for display.
    pub label: String,
}

impl SegmentDraft {
    /// Create a new draft segment.
    pub fn new(start: f64, end: f64, kind: SegmentKind, confidence: f64) -> Self {
        Self {
            start,
            end,
            kind,
            confidence,
            label: String::new(),
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A time-range annotation held by a `TimeSegmentIndex`.
///
/// Segments in one index never overlap and are kept ascending by `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Index-assigned identifier.
    pub id: SegmentId,
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    /// Classification of the range.
    pub kind: SegmentKind,
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable label for display.
    pub label: String,
}

impl Segment {
    /// Check whether a point in time falls inside this segment.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Check whether this segment's interval intersects `[a, b)`.
    pub fn intersects(&self, a: f64, b: f64) -> bool {
        self.start < b && a < self.end
    }

    /// Length of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A confidence-scored recommended edit tied to one stage's findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Category of the suggestion.
    pub kind: SuggestionKind,
    /// Short display title.
    pub title: String,
    /// Longer explanation of the finding.
    pub description: String,
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
    /// Machine-readable action hint for the consumer (e.g. "trim 0:12-0:15").
    pub action: String,
    /// Name of the stage that produced this suggestion.
    pub source_stage: String,
}

impl Suggestion {
    /// Create a new suggestion attributed to a stage.
    pub fn new(
        kind: SuggestionKind,
        title: impl Into<String>,
        confidence: f64,
        source_stage: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            description: String::new(),
            confidence,
            action: String::new(),
            source_stage: source_stage.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the action hint.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }
}
