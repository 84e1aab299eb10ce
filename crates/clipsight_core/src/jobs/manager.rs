//! Job table, per-asset mutual exclusion, and observer fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::models::{Segment, SegmentDraft, SegmentId, Suggestion, SuggestionKind};
use crate::stages::StagePlan;

use super::errors::{JobError, JobResult};
use super::events::{JobEvent, JobObserver};
use super::job::{Job, JobSnapshot, JobState};

/// Coordinates many concurrently submitted jobs.
///
/// Each job lives behind its own mutex so transition application is
/// serialized per job (single writer) without a table-wide lock.
/// Cross-job reads clone `Arc` handles out of the table first and take
/// each job lock briefly, so no lock is held across the whole set.
pub struct JobManager {
    plan: Arc<StagePlan>,
    jobs: RwLock<HashMap<String, Arc<Mutex<Job>>>>,
    /// Assets with an active (started, non-terminal) job.
    active_assets: Mutex<HashSet<String>>,
    observers: RwLock<Vec<JobObserver>>,
    next_job: AtomicU64,
}

impl JobManager {
    /// Create a manager over a validated stage plan.
    pub fn new(plan: StagePlan) -> Self {
        Self {
            plan: Arc::new(plan),
            jobs: RwLock::new(HashMap::new()),
            active_assets: Mutex::new(HashSet::new()),
            observers: RwLock::new(Vec::new()),
            next_job: AtomicU64::new(1),
        }
    }

    /// The shared stage plan.
    pub fn plan(&self) -> &Arc<StagePlan> {
        &self.plan
    }

    /// Register an observer for job events.
    pub fn subscribe(&self, observer: JobObserver) {
        self.observers.write().push(observer);
    }

    /// Create a queued job for an asset and return its id.
    ///
    /// Fails with `AlreadyProcessing` while the asset has an active job;
    /// retry by submitting a fresh job once that job reaches a terminal
    /// state (jobs are never retried in place).
    pub fn submit(&self, asset: impl Into<String>) -> JobResult<String> {
        let asset = asset.into();
        if self.active_assets.lock().contains(&asset) {
            return Err(JobError::already_processing(&asset));
        }

        let id = format!("job-{}", self.next_job.fetch_add(1, Ordering::SeqCst));
        let job = Job::new(&id, &asset, Arc::clone(&self.plan));
        self.jobs.write().insert(id.clone(), Arc::new(Mutex::new(job)));

        tracing::info!(job = %id, %asset, "job submitted");
        self.emit(&JobEvent::Submitted {
            job_id: id.clone(),
            asset,
        });
        Ok(id)
    }

    /// Start a job, acquiring the per-asset lock.
    pub fn start(&self, job_id: &str) -> JobResult<()> {
        let handle = self.handle(job_id)?;
        let mut job = handle.lock();

        {
            let mut active = self.active_assets.lock();
            if active.contains(job.asset()) {
                return Err(JobError::already_processing(job.asset()));
            }
            active.insert(job.asset().to_string());
        }

        if let Err(e) = job.start() {
            // Acquisition rolls back when the transition is refused.
            self.active_assets.lock().remove(job.asset());
            return Err(e);
        }
        drop(job);

        self.emit(&JobEvent::StateChanged {
            job_id: job_id.to_string(),
            from: JobState::Queued,
            to: JobState::Transporting,
        });
        Ok(())
    }

    /// Forward a transport progress report.
    pub fn transport_progress(&self, job_id: &str, percent: f64) -> JobResult<f64> {
        let handle = self.handle(job_id)?;
        let mut job = handle.lock();
        let progress = job.transport_progress(percent)?;
        drop(job);

        self.emit(&JobEvent::Progress {
            job_id: job_id.to_string(),
            percent: progress,
        });
        Ok(progress)
    }

    /// Complete transport with the asset duration.
    pub fn transport_complete(&self, job_id: &str, duration: f64) -> JobResult<()> {
        let handle = self.handle(job_id)?;
        let mut job = handle.lock();
        job.transport_complete(duration)?;
        let progress = job.progress();
        drop(job);

        self.emit(&JobEvent::StateChanged {
            job_id: job_id.to_string(),
            from: JobState::Transporting,
            to: JobState::Analyzing,
        });
        self.emit(&JobEvent::Progress {
            job_id: job_id.to_string(),
            percent: progress,
        });
        Ok(())
    }

    /// Apply a completed stage's findings to a job. Returns `true` when
    /// applied, `false` for a duplicate no-op.
    pub fn stage_complete(
        &self,
        job_id: &str,
        stage: &str,
        segments: Vec<SegmentDraft>,
        suggestions: Vec<Suggestion>,
    ) -> JobResult<bool> {
        let handle = self.handle(job_id)?;
        let mut job = handle.lock();
        let applied = job.stage_complete(stage, segments, suggestions)?;
        let progress = job.progress();
        let state = job.state();
        drop(job);

        if applied {
            self.emit(&JobEvent::Progress {
                job_id: job_id.to_string(),
                percent: progress,
            });
            if state == JobState::Finalizing {
                self.emit(&JobEvent::StateChanged {
                    job_id: job_id.to_string(),
                    from: JobState::Analyzing,
                    to: JobState::Finalizing,
                });
            }
        }
        Ok(applied)
    }

    /// Finalize a job, releasing the per-asset lock.
    pub fn finalize(&self, job_id: &str) -> JobResult<()> {
        let handle = self.handle(job_id)?;
        let mut job = handle.lock();
        job.finalize()?;
        let asset = job.asset().to_string();
        drop(job);

        self.active_assets.lock().remove(&asset);
        tracing::info!(job = %job_id, "job completed");
        self.emit(&JobEvent::StateChanged {
            job_id: job_id.to_string(),
            from: JobState::Finalizing,
            to: JobState::Completed,
        });
        self.emit(&JobEvent::Completed {
            job_id: job_id.to_string(),
        });
        Ok(())
    }

    /// Fail a job from any non-terminal state, releasing the per-asset
    /// lock. Completed-stage annotations are retained.
    pub fn fail(&self, job_id: &str, reason: impl Into<String>) -> JobResult<()> {
        let reason = reason.into();
        let handle = self.handle(job_id)?;
        let mut job = handle.lock();
        let from = job.state();
        job.fail(reason.clone())?;
        let asset = job.asset().to_string();
        drop(job);

        // A queued job never acquired the per-asset lock; removing the
        // asset here would free a lock held by a different active job.
        if from != JobState::Queued {
            self.active_assets.lock().remove(&asset);
        }
        self.emit(&JobEvent::StateChanged {
            job_id: job_id.to_string(),
            from,
            to: JobState::Failed,
        });
        self.emit(&JobEvent::Failed {
            job_id: job_id.to_string(),
            reason,
        });
        Ok(())
    }

    /// Cancel a job. Forward-only: already-emitted annotations from
    /// completed stages are retained.
    pub fn cancel(&self, job_id: &str) -> JobResult<()> {
        self.fail(job_id, "cancelled")
    }

    /// Snapshot one job.
    pub fn snapshot(&self, job_id: &str) -> JobResult<JobSnapshot> {
        Ok(self.handle(job_id)?.lock().snapshot())
    }

    /// Snapshot every job. Handles are cloned out of the table first so
    /// no lock is held across the whole set while snapshotting.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let handles: Vec<Arc<Mutex<Job>>> = self.jobs.read().values().cloned().collect();
        handles.iter().map(|h| h.lock().snapshot()).collect()
    }

    /// Segment containing time `t` for a job (seek/scrub lookup).
    pub fn query(&self, job_id: &str, t: f64) -> JobResult<Option<Segment>> {
        let handle = self.handle(job_id)?;
        let job = handle.lock();
        let hit = job.query(t)?.cloned();
        Ok(hit)
    }

    /// Segments of a job intersecting `[a, b)`, ascending by start.
    pub fn query_range(&self, job_id: &str, a: f64, b: f64) -> JobResult<Vec<Segment>> {
        let handle = self.handle(job_id)?;
        let job = handle.lock();
        let segments: Vec<Segment> = job.query_range(a, b)?.cloned().collect();
        Ok(segments)
    }

    /// Remove a segment from a non-terminal job.
    pub fn remove_segment(&self, job_id: &str, segment_id: SegmentId) -> JobResult<Segment> {
        self.handle(job_id)?.lock().remove_segment(segment_id)
    }

    /// A job's suggestions ordered by descending confidence, ties broken
    /// by stage emission order.
    pub fn ranked_suggestions(&self, job_id: &str) -> JobResult<Vec<Suggestion>> {
        let handle = self.handle(job_id)?;
        let job = handle.lock();
        Ok(job.suggestions().rank().into_iter().cloned().collect())
    }

    /// A job's suggestions filtered to one kind, in insertion order.
    pub fn suggestions_by_kind(
        &self,
        job_id: &str,
        kind: SuggestionKind,
    ) -> JobResult<Vec<Suggestion>> {
        let handle = self.handle(job_id)?;
        let job = handle.lock();
        Ok(job.suggestions().for_kind(kind).cloned().collect())
    }

    /// Cross-job insights view: every job's suggestions, ordered by
    /// descending confidence, as a consistent point-in-time copy.
    pub fn insights(&self) -> Vec<(String, Suggestion)> {
        let handles: Vec<Arc<Mutex<Job>>> = self.jobs.read().values().cloned().collect();
        let mut all: Vec<(String, Suggestion)> = Vec::new();
        for handle in &handles {
            let job = handle.lock();
            let id = job.id().to_string();
            all.extend(job.suggestions().items().iter().map(|s| (id.clone(), s.clone())));
        }
        all.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
        all
    }

    /// Number of jobs in the table.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    fn handle(&self, job_id: &str) -> JobResult<Arc<Mutex<Job>>> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::unknown_job(job_id))
    }

    fn emit(&self, event: &JobEvent) {
        for observer in self.observers.read().iter() {
            observer(event);
        }
    }
}
