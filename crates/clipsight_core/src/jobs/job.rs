//! Per-asset job lifecycle state machine.
//!
//! A job advances `queued → transporting → analyzing → finalizing →
//! completed`, with `failed` reachable from any non-terminal state. The
//! job is the sole owner of its state field, progress value, segment
//! index, and suggestion set; external readers get cloned snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{Segment, SegmentDraft, SegmentId, Suggestion};
use crate::stages::{ProgressEngine, StageError, StagePlan};
use crate::suggestions::{SuggestionError, SuggestionSet};
use crate::timeline::{TimeSegmentIndex, TimelineError};

use super::errors::{JobError, JobResult};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, not yet started.
    Queued,
    /// Asset transport in progress.
    Transporting,
    /// Analysis stages running.
    Analyzing,
    /// All analysis stages complete, awaiting finalize.
    Finalizing,
    /// Terminal: finished successfully.
    Completed,
    /// Terminal: failed with a recorded reason.
    Failed,
}

impl JobState {
    /// Whether no further transitions are permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Transporting => "transporting",
            JobState::Analyzing => "analyzing",
            JobState::Finalizing => "finalizing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only projection of a job for presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: String,
    /// Asset reference the job was submitted for.
    pub asset: String,
    /// Current lifecycle state.
    pub state: JobState,
    /// Progress in [0, 100].
    pub progress: f64,
    /// Asset duration in seconds, once known.
    pub duration: Option<f64>,
    /// Segments ascending by start.
    pub segments: Vec<Segment>,
    /// Suggestions in insertion order.
    pub suggestions: Vec<Suggestion>,
    /// Failure reason, present only in `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was started (RFC 3339).
    pub started_at: Option<String>,
}

/// One media-processing job and its accumulated annotations.
#[derive(Debug)]
pub struct Job {
    id: String,
    asset: String,
    state: JobState,
    progress: f64,
    /// Completed-stage bitmask indexed by plan position (bit 0 = transport).
    completed_mask: u64,
    duration: Option<f64>,
    /// Built once the duration is known at transport completion.
    segments: Option<TimeSegmentIndex>,
    suggestions: SuggestionSet,
    error: Option<String>,
    started_at: Option<String>,
    engine: ProgressEngine,
}

impl Job {
    /// Create a queued job for an asset.
    pub fn new(id: impl Into<String>, asset: impl Into<String>, plan: Arc<StagePlan>) -> Self {
        Self {
            id: id.into(),
            asset: asset.into(),
            state: JobState::Queued,
            progress: 0.0,
            completed_mask: 0,
            duration: None,
            segments: None,
            suggestions: SuggestionSet::new(),
            error: None,
            started_at: None,
            engine: ProgressEngine::new(plan),
        }
    }

    /// Job id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Asset reference.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Current progress in [0, 100].
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Asset duration in seconds, once supplied by transport.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Failure reason, present only when failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Segments ascending by start (empty until analysis stages run).
    pub fn segments(&self) -> &[Segment] {
        self.segments.as_ref().map_or(&[], |i| i.segments())
    }

    /// The suggestion set.
    pub fn suggestions(&self) -> &SuggestionSet {
        &self.suggestions
    }

    /// Start the job: `queued → transporting`.
    pub fn start(&mut self) -> JobResult<()> {
        self.expect_state(JobState::Queued, "start")?;
        self.started_at = Some(chrono::Local::now().to_rfc3339());
        self.set_state(JobState::Transporting);
        self.progress = 0.0;
        Ok(())
    }

    /// Apply a transport progress report (the collaborator's own 0-100
    /// percent), scaled by the transport stage weight. Stale or
    /// out-of-order reports are idempotently discarded by the monotonic
    /// clamp. Returns the new progress value.
    pub fn transport_progress(&mut self, percent: f64) -> JobResult<f64> {
        self.expect_state(JobState::Transporting, "transport_progress")?;
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        let candidate = fraction * self.engine.plan().transport().weight as f64;
        self.progress = self.progress.max(candidate);
        Ok(self.progress)
    }

    /// Complete transport: `transporting → analyzing`. Fixes the asset
    /// duration and creates the segment index over it.
    pub fn transport_complete(&mut self, duration: f64) -> JobResult<()> {
        self.expect_state(JobState::Transporting, "transport_complete")?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(JobError::InvalidDuration { value: duration });
        }
        self.duration = Some(duration);
        self.segments = Some(TimeSegmentIndex::new(duration));
        self.completed_mask |= 1;
        self.progress = self
            .progress
            .max(self.engine.plan().transport().weight as f64);
        self.set_state(JobState::Analyzing);
        Ok(())
    }

    /// Apply a completed analysis stage's findings.
    ///
    /// Returns `true` when the stage was applied, `false` when it was a
    /// duplicate report (a no-op: progress, segments, and suggestions are
    /// unchanged). Segments are validated as a batch before any insert,
    /// so a bad batch leaves the index untouched. When every analysis
    /// stage has completed the job moves to `finalizing`.
    pub fn stage_complete(
        &mut self,
        stage: &str,
        segments: Vec<SegmentDraft>,
        suggestions: Vec<Suggestion>,
    ) -> JobResult<bool> {
        // A duplicate report may arrive after the last stage already
        // moved the job to finalizing (concurrent stage workers report
        // out of order); the bitmask discards it below like any other
        // duplicate. Everything else requires the analyzing state.
        if self.state != JobState::Finalizing {
            self.expect_state(JobState::Analyzing, "stage_complete")?;
        }

        let plan = self.engine.plan();
        let at = plan
            .index_of(stage)
            .ok_or_else(|| StageError::unknown_stage(stage))?;
        if at == 0 {
            return Err(JobError::invalid_transition(
                &self.id,
                self.state,
                "stage_complete for the transport stage",
            ));
        }

        let bit = 1u64 << at;
        if self.completed_mask & bit != 0 {
            tracing::debug!(job = %self.id, stage, "duplicate stage completion ignored");
            return Ok(false);
        }
        if self.state == JobState::Finalizing {
            // Finalizing means every analysis bit is set, so only an
            // unapplied stage can reach here; refuse it.
            return Err(JobError::invalid_transition(
                &self.id,
                self.state,
                "stage_complete",
            ));
        }

        let index = self.segments.as_mut().ok_or_else(|| JobError::DurationUnknown {
            id: self.id.clone(),
        })?;

        // Validate the whole batch (against the index and within the
        // batch) before inserting anything.
        for (i, draft) in segments.iter().enumerate() {
            index.check(draft)?;
            for earlier in &segments[..i] {
                if draft.start < earlier.end && earlier.start < draft.end {
                    return Err(TimelineError::Overlap {
                        start: draft.start,
                        end: draft.end,
                        existing_start: earlier.start,
                        existing_end: earlier.end,
                    }
                    .into());
                }
            }
        }
        for draft in segments {
            index.insert(draft)?;
        }

        for suggestion in suggestions {
            match self.suggestions.add(suggestion) {
                Ok(()) => {}
                Err(SuggestionError::Duplicate { kind, stage }) => {
                    tracing::warn!(job = %self.id, %kind, stage = %stage, "dropping duplicate suggestion");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.completed_mask |= bit;
        let completed = self.engine.completed_weight(self.completed_mask);
        self.progress = self.progress.max(completed.min(100.0));

        if self.completed_mask & self.engine.plan().analysis_mask()
            == self.engine.plan().analysis_mask()
        {
            self.set_state(JobState::Finalizing);
        }
        Ok(true)
    }

    /// Finalize: `finalizing → completed`. Progress becomes 100 and the
    /// segment index and suggestion set freeze.
    pub fn finalize(&mut self) -> JobResult<()> {
        self.expect_state(JobState::Finalizing, "finalize")?;
        self.progress = 100.0;
        self.freeze();
        self.set_state(JobState::Completed);
        Ok(())
    }

    /// Fail the job from any non-terminal state. Progress freezes at its
    /// last value; segments and suggestions from completed stages are
    /// retained (forward-only, nothing rolls back).
    pub fn fail(&mut self, reason: impl Into<String>) -> JobResult<()> {
        if self.state.is_terminal() {
            return Err(JobError::terminal(&self.id, self.state));
        }
        let reason = reason.into();
        tracing::warn!(job = %self.id, state = %self.state, %reason, "job failed");
        self.error = Some(reason);
        self.freeze();
        self.set_state(JobState::Failed);
        Ok(())
    }

    /// Find the segment containing time `t` (seek/scrub lookups).
    pub fn query(&self, t: f64) -> JobResult<Option<&Segment>> {
        Ok(self.index()?.query(t)?)
    }

    /// Segments intersecting `[a, b)`, ascending by start.
    pub fn query_range(&self, a: f64, b: f64) -> JobResult<impl Iterator<Item = &Segment>> {
        Ok(self.index()?.query_range(a, b))
    }

    /// Remove a segment by id. Allowed only while the job is
    /// non-terminal; the frozen index rejects it afterwards.
    pub fn remove_segment(&mut self, id: SegmentId) -> JobResult<Segment> {
        let job_id = self.id.clone();
        let index = self
            .segments
            .as_mut()
            .ok_or(JobError::DurationUnknown { id: job_id })?;
        Ok(index.remove(id)?)
    }

    /// Clone a read-only snapshot for presentation layers.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            asset: self.asset.clone(),
            state: self.state,
            progress: self.progress,
            duration: self.duration,
            segments: self.segments().to_vec(),
            suggestions: self.suggestions.items().to_vec(),
            error: self.error.clone(),
            started_at: self.started_at.clone(),
        }
    }

    fn index(&self) -> JobResult<&TimeSegmentIndex> {
        self.segments.as_ref().ok_or_else(|| JobError::DurationUnknown {
            id: self.id.clone(),
        })
    }

    fn expect_state(&self, expected: JobState, event: &str) -> JobResult<()> {
        if self.state == expected {
            return Ok(());
        }
        if self.state.is_terminal() {
            Err(JobError::terminal(&self.id, self.state))
        } else {
            Err(JobError::invalid_transition(&self.id, self.state, event))
        }
    }

    fn set_state(&mut self, to: JobState) {
        tracing::debug!(job = %self.id, from = %self.state, to = %to, "state transition");
        self.state = to;
    }

    fn freeze(&mut self) {
        if let Some(index) = self.segments.as_mut() {
            index.freeze();
        }
        self.suggestions.freeze();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SegmentKind, SuggestionKind};
    use crate::stages::StageDefinition;

    fn test_plan() -> Arc<StagePlan> {
        Arc::new(
            StagePlan::new(vec![
                StageDefinition::new("transport", 15),
                StageDefinition::new("scene", 30),
                StageDefinition::new("audio", 25),
                StageDefinition::new("enhance", 30),
            ])
            .unwrap(),
        )
    }

    fn analyzing_job() -> Job {
        let mut job = Job::new("job-1", "asset-1", test_plan());
        job.start().unwrap();
        job.transport_complete(120.0).unwrap();
        job
    }

    fn draft(start: f64, end: f64) -> SegmentDraft {
        SegmentDraft::new(start, end, SegmentKind::Scene, 0.9)
    }

    fn suggestion(kind: SuggestionKind, stage: &str) -> Suggestion {
        Suggestion::new(kind, "finding", 0.7, stage)
    }

    #[test]
    fn full_lifecycle_scenario() {
        let mut job = Job::new("job-1", "asset-1", test_plan());
        assert_eq!(job.state(), JobState::Queued);
        assert_eq!(job.progress(), 0.0);

        job.start().unwrap();
        assert_eq!(job.state(), JobState::Transporting);

        job.transport_complete(120.0).unwrap();
        assert_eq!(job.state(), JobState::Analyzing);
        assert_eq!(job.progress(), 15.0);

        job.stage_complete("scene", vec![], vec![]).unwrap();
        assert_eq!(job.progress(), 45.0);

        job.stage_complete("audio", vec![], vec![]).unwrap();
        assert_eq!(job.progress(), 70.0);

        job.stage_complete("enhance", vec![], vec![]).unwrap();
        assert_eq!(job.progress(), 100.0);
        assert_eq!(job.state(), JobState::Finalizing);

        job.finalize().unwrap();
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.progress(), 100.0);
    }

    #[test]
    fn transport_progress_is_monotonic() {
        let mut job = Job::new("job-1", "asset-1", test_plan());
        job.start().unwrap();

        assert_eq!(job.transport_progress(50.0).unwrap(), 7.5);
        // Stale out-of-order report is discarded by the clamp.
        assert_eq!(job.transport_progress(20.0).unwrap(), 7.5);
        assert_eq!(job.transport_progress(100.0).unwrap(), 15.0);
        // Over-range report cannot push past the transport weight.
        assert_eq!(job.transport_progress(150.0).unwrap(), 15.0);
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = analyzing_job();
        let mut last = job.progress();
        for stage in ["enhance", "scene", "audio"] {
            job.stage_complete(stage, vec![], vec![]).unwrap();
            assert!(job.progress() >= last);
            last = job.progress();
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn duplicate_stage_complete_is_noop() {
        let mut job = analyzing_job();
        job.stage_complete(
            "scene",
            vec![draft(0.0, 10.0)],
            vec![suggestion(SuggestionKind::Cut, "scene")],
        )
        .unwrap();
        let progress = job.progress();

        let applied = job
            .stage_complete(
                "scene",
                vec![draft(20.0, 30.0)],
                vec![suggestion(SuggestionKind::Color, "scene")],
            )
            .unwrap();
        assert!(!applied);
        assert_eq!(job.progress(), progress);
        assert_eq!(job.segments().len(), 1);
        assert_eq!(job.suggestions().len(), 1);
    }

    #[test]
    fn late_duplicate_after_finalizing_is_noop() {
        let mut job = analyzing_job();
        for stage in ["scene", "audio", "enhance"] {
            job.stage_complete(stage, vec![], vec![]).unwrap();
        }
        assert_eq!(job.state(), JobState::Finalizing);

        // A stale report from a concurrent worker is discarded.
        let applied = job
            .stage_complete("scene", vec![draft(0.0, 10.0)], vec![])
            .unwrap();
        assert!(!applied);
        assert_eq!(job.state(), JobState::Finalizing);
        assert_eq!(job.progress(), 100.0);
        assert!(job.segments().is_empty());
    }

    #[test]
    fn unknown_stage_rejected() {
        let mut job = analyzing_job();
        let err = job.stage_complete("sharpen", vec![], vec![]).unwrap_err();
        assert!(matches!(
            err,
            JobError::Stage(StageError::UnknownStage { .. })
        ));
    }

    #[test]
    fn transport_stage_cannot_complete_as_analysis() {
        let mut job = analyzing_job();
        let err = job.stage_complete("transport", vec![], vec![]).unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }

    #[test]
    fn bad_segment_batch_leaves_index_untouched() {
        let mut job = analyzing_job();
        let err = job
            .stage_complete("scene", vec![draft(0.0, 25.0), draft(20.0, 30.0)], vec![])
            .unwrap_err();
        assert!(matches!(err, JobError::Timeline(TimelineError::Overlap { .. })));
        assert!(job.segments().is_empty());
        // Stage not marked complete; a corrected retry applies.
        assert!(job
            .stage_complete("scene", vec![draft(0.0, 25.0)], vec![])
            .unwrap());
    }

    #[test]
    fn duplicate_suggestion_in_batch_is_dropped() {
        let mut job = analyzing_job();
        job.stage_complete(
            "scene",
            vec![],
            vec![
                suggestion(SuggestionKind::Cut, "scene"),
                suggestion(SuggestionKind::Cut, "scene"),
            ],
        )
        .unwrap();
        assert_eq!(job.suggestions().len(), 1);
    }

    #[test]
    fn fail_preserves_annotations_and_blocks_further_events() {
        let mut job = analyzing_job();
        job.stage_complete("scene", vec![draft(0.0, 10.0)], vec![])
            .unwrap();

        job.fail("device disconnected").unwrap();
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error(), Some("device disconnected"));
        assert_eq!(job.segments().len(), 1);

        let err = job.stage_complete("audio", vec![], vec![]).unwrap_err();
        assert!(matches!(err, JobError::Terminal { .. }));
        assert!(matches!(
            job.remove_segment(job.segments()[0].id),
            Err(JobError::Timeline(TimelineError::Immutable))
        ));
    }

    #[test]
    fn fail_from_terminal_rejected() {
        let mut job = analyzing_job();
        job.fail("first").unwrap();
        assert!(matches!(job.fail("second"), Err(JobError::Terminal { .. })));
        assert_eq!(job.error(), Some("first"));
    }

    #[test]
    fn progress_frozen_at_failure_value() {
        let mut job = analyzing_job();
        job.stage_complete("scene", vec![], vec![]).unwrap();
        job.fail("cancelled").unwrap();
        assert_eq!(job.progress(), 45.0);
    }

    #[test]
    fn events_out_of_state_rejected() {
        let mut job = Job::new("job-1", "asset-1", test_plan());
        assert!(matches!(
            job.stage_complete("scene", vec![], vec![]),
            Err(JobError::InvalidTransition { .. })
        ));
        assert!(matches!(
            job.transport_complete(60.0),
            Err(JobError::InvalidTransition { .. })
        ));

        job.start().unwrap();
        assert!(matches!(job.start(), Err(JobError::InvalidTransition { .. })));
        assert!(matches!(job.finalize(), Err(JobError::InvalidTransition { .. })));
    }

    #[test]
    fn invalid_duration_rejected() {
        let mut job = Job::new("job-1", "asset-1", test_plan());
        job.start().unwrap();
        assert!(matches!(
            job.transport_complete(0.0),
            Err(JobError::InvalidDuration { .. })
        ));
        assert!(matches!(
            job.transport_complete(f64::NAN),
            Err(JobError::InvalidDuration { .. })
        ));
        // Still transporting; a valid report succeeds.
        job.transport_complete(60.0).unwrap();
    }

    #[test]
    fn query_before_duration_known_fails() {
        let job = Job::new("job-1", "asset-1", test_plan());
        assert!(matches!(job.query(1.0), Err(JobError::DurationUnknown { .. })));
    }

    #[test]
    fn snapshot_reflects_job() {
        let mut job = analyzing_job();
        job.stage_complete(
            "scene",
            vec![draft(5.0, 15.0)],
            vec![suggestion(SuggestionKind::Cut, "scene")],
        )
        .unwrap();

        let snap = job.snapshot();
        assert_eq!(snap.id, "job-1");
        assert_eq!(snap.state, JobState::Analyzing);
        assert_eq!(snap.duration, Some(120.0));
        assert_eq!(snap.segments.len(), 1);
        assert_eq!(snap.suggestions.len(), 1);
        assert!(snap.started_at.is_some());

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"state\":\"analyzing\""));
    }
}
