//! Ordered, non-overlapping interval collection over an asset's duration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Segment, SegmentDraft, SegmentId};

/// Errors from timeline index operations.
#[derive(Error, Debug)]
pub enum TimelineError {
    /// Candidate interval intersects an existing segment.
    #[error("segment [{start}, {end}) overlaps existing segment [{existing_start}, {existing_end})")]
    Overlap {
        start: f64,
        end: f64,
        existing_start: f64,
        existing_end: f64,
    },

    /// Interval or point lies outside the indexed duration.
    #[error("time range [{start}, {end}) is outside [0, {duration})")]
    OutOfRange {
        start: f64,
        end: f64,
        duration: f64,
    },

    /// The index is frozen (owning job reached a terminal state).
    #[error("segment index is frozen and can no longer be modified")]
    Immutable,

    /// No segment with the given id exists.
    #[error("no segment with id {id}")]
    UnknownSegment { id: SegmentId },
}

impl TimelineError {
    /// Create an out-of-range error for a single point in time.
    pub fn point_out_of_range(t: f64, duration: f64) -> Self {
        Self::OutOfRange {
            start: t,
            end: t,
            duration,
        }
    }
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Ordered, non-overlapping interval collection over `[0, duration)`.
///
/// Segments are kept in a Vec sorted ascending by start time; insertion
/// position and point lookups use binary search. Gaps between segments
/// are permitted (unanalyzed regions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSegmentIndex {
    /// Asset duration in seconds; the valid domain is `[0, duration)`.
    duration: f64,
    /// Segments ascending by start, pairwise disjoint.
    segments: Vec<Segment>,
    /// Next id to assign on insert.
    next_id: u64,
    /// Set when the owning job reaches a terminal state.
    frozen: bool,
}

impl TimeSegmentIndex {
    /// Create an empty index for an asset of the given duration (seconds).
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            segments: Vec::new(),
            next_id: 1,
            frozen: false,
        }
    }

    /// The indexed duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of segments in the index.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the index holds no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments, ascending by start.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the index has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze the index. Called by the owning job on terminal transition;
    /// every mutation afterwards fails with `Immutable`.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Validate a draft against the duration bounds and existing segments
    /// without inserting it.
    pub fn check(&self, draft: &SegmentDraft) -> TimelineResult<()> {
        if !draft.start.is_finite()
            || !draft.end.is_finite()
            || draft.start < 0.0
            || draft.start >= draft.end
            || draft.end > self.duration
        {
            return Err(TimelineError::OutOfRange {
                start: draft.start,
                end: draft.end,
                duration: self.duration,
            });
        }

        // First segment starting at or after the draft; only it and its
        // predecessor can possibly intersect.
        let at = self.segments.partition_point(|s| s.start < draft.start);

        if let Some(prev) = at.checked_sub(1).and_then(|i| self.segments.get(i)) {
            if prev.end > draft.start {
                return Err(self.overlap_error(draft, prev));
            }
        }
        if let Some(next) = self.segments.get(at) {
            if next.start < draft.end {
                return Err(self.overlap_error(draft, next));
            }
        }
        Ok(())
    }

    /// Insert a segment, preserving ascending order by start.
    ///
    /// Fails with `Overlap` if the candidate interval intersects any
    /// existing segment, leaving the index unchanged.
    pub fn insert(&mut self, draft: SegmentDraft) -> TimelineResult<SegmentId> {
        if self.frozen {
            return Err(TimelineError::Immutable);
        }
        self.check(&draft)?;

        let at = self.segments.partition_point(|s| s.start < draft.start);
        let id = SegmentId(self.next_id);
        self.next_id += 1;

        self.segments.insert(
            at,
            Segment {
                id,
                start: draft.start,
                end: draft.end,
                kind: draft.kind,
                confidence: draft.confidence,
                label: draft.label,
            },
        );
        Ok(id)
    }

    /// Find the segment containing time `t`, if any.
    ///
    /// Fails with `OutOfRange` when `t` lies outside `[0, duration)`.
    pub fn query(&self, t: f64) -> TimelineResult<Option<&Segment>> {
        if !t.is_finite() || t < 0.0 || t >= self.duration {
            return Err(TimelineError::point_out_of_range(t, self.duration));
        }

        // Last segment with start <= t is the only candidate.
        let at = self.segments.partition_point(|s| s.start <= t);
        Ok(at
            .checked_sub(1)
            .and_then(|i| self.segments.get(i))
            .filter(|s| s.contains(t)))
    }

    /// Iterate segments whose interval intersects `[a, b)`, ascending by
    /// start. The iterator is lazy and restartable; the index is
    /// append-only while the owning job lives, so re-invocation with the
    /// same arguments yields identical results.
    pub fn query_range(&self, a: f64, b: f64) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .skip_while(move |s| s.end <= a)
            .take_while(move |s| s.start < b)
    }

    /// Remove a segment by id, returning it.
    ///
    /// Fails with `Immutable` once the owning job is terminal.
    pub fn remove(&mut self, id: SegmentId) -> TimelineResult<Segment> {
        if self.frozen {
            return Err(TimelineError::Immutable);
        }
        let at = self
            .segments
            .iter()
            .position(|s| s.id == id)
            .ok_or(TimelineError::UnknownSegment { id })?;
        Ok(self.segments.remove(at))
    }

    fn overlap_error(&self, draft: &SegmentDraft, existing: &Segment) -> TimelineError {
        TimelineError::Overlap {
            start: draft.start,
            end: draft.end,
            existing_start: existing.start,
            existing_end: existing.end,
        }
    }
}
