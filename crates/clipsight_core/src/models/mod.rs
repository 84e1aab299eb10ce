//! Data model types shared across the crate.

mod annotations;
mod enums;

pub use annotations::{Segment, SegmentDraft, SegmentId, Suggestion};
pub use enums::{SegmentKind, SuggestionKind};
