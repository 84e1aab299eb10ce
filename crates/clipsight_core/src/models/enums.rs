//! Classification enums for timeline segments and suggestions.

use serde::{Deserialize, Serialize};

/// Classification of a timeline segment.
///
/// A point in the asset belongs to at most one kind at a time, like
/// labels on a single editor track lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// A detected scene.
    Scene,
    /// A cut or dissolve between scenes.
    Transition,
    /// An audio-derived region (speech, music, silence).
    Audio,
    /// A region flagged for an effect or correction.
    Effect,
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKind::Scene => write!(f, "scene"),
            SegmentKind::Transition => write!(f, "transition"),
            SegmentKind::Audio => write!(f, "audio"),
            SegmentKind::Effect => write!(f, "effect"),
        }
    }
}

/// Category of an improvement suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Trim or remove a portion of the asset.
    Cut,
    /// Color grading or white-balance correction.
    Color,
    /// Audio level or noise treatment.
    Audio,
    /// Stabilization of shaky footage.
    Stabilize,
    /// General quality fix (resolution, compression artifacts).
    Quality,
}

impl SuggestionKind {
    /// Get all suggestion kinds.
    pub fn all() -> &'static [SuggestionKind] {
        &[
            Self::Cut,
            Self::Color,
            Self::Audio,
            Self::Stabilize,
            Self::Quality,
        ]
    }
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestionKind::Cut => write!(f, "cut"),
            SuggestionKind::Color => write!(f, "color"),
            SuggestionKind::Audio => write!(f, "audio"),
            SuggestionKind::Stabilize => write!(f, "stabilize"),
            SuggestionKind::Quality => write!(f, "quality"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SegmentKind::Transition).unwrap();
        assert_eq!(json, "\"transition\"");
    }

    #[test]
    fn segment_kind_deserializes_lowercase() {
        let kind: SegmentKind = serde_json::from_str("\"effect\"").unwrap();
        assert_eq!(kind, SegmentKind::Effect);
    }

    #[test]
    fn suggestion_kind_all_is_complete() {
        assert_eq!(SuggestionKind::all().len(), 5);
    }
}
