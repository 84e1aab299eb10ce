//! Timeline segment index.
//!
//! Anchors annotations to time ranges over `[0, duration)`. The index
//! guarantees that no two segments overlap and that iteration order is
//! ascending by start time.

mod index;

pub use index::{TimeSegmentIndex, TimelineError, TimelineResult};
