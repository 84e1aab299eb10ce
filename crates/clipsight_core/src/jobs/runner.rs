//! Runner that drives a job's analysis stages through registered
//! analyzers, in plan order, with cancellation at stage boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::stages::StageAnalyzer;

use super::errors::{JobError, JobResult};
use super::job::JobState;
use super::manager::JobManager;

/// Handle for cancelling a running analysis.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation. The runner stops at the next stage boundary
    /// and fails the job with reason "cancelled".
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of running a job's analysis stages.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Job that was driven.
    pub job_id: String,
    /// Whether the job reached `completed`.
    pub success: bool,
    /// Failure reason (if the job failed).
    pub error: Option<String>,
    /// Stages applied, in completion order.
    pub stages_completed: Vec<String>,
}

/// Drives analyzers against a job in stage-plan order.
///
/// The runner owns the liveness requirement on the analysis side: every
/// stage either reports findings (`stage_complete`) or a failure reason
/// (`fail`), so a running job always ends terminal.
pub struct AnalysisRunner {
    analyzers: Vec<Box<dyn StageAnalyzer>>,
    cancelled: Arc<AtomicBool>,
}

impl AnalysisRunner {
    /// Create a runner with no analyzers.
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add an analyzer (builder pattern).
    pub fn with_analyzer<A: StageAnalyzer + 'static>(mut self, analyzer: A) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    /// Get a cancellation handle.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Number of registered analyzers.
    pub fn analyzer_count(&self) -> usize {
        self.analyzers.len()
    }

    /// Run all analysis stages for a job that has finished transport,
    /// then finalize it.
    ///
    /// Stages execute in plan order; an analyzer failure or a
    /// cancellation request fails the job and stops the run. A plan
    /// stage with no registered analyzer is a configuration fault and
    /// also fails the job. Returns `Err` only for bookkeeping problems
    /// (unknown job id); analysis failures are reported in the summary
    /// after the job itself has been failed.
    pub fn run(&self, manager: &JobManager, job_id: &str) -> JobResult<RunSummary> {
        let snapshot = manager.snapshot(job_id)?;
        if snapshot.state != JobState::Analyzing {
            return Err(JobError::invalid_transition(
                job_id,
                snapshot.state,
                "analysis run",
            ));
        }
        let duration = snapshot.duration.ok_or_else(|| JobError::DurationUnknown {
            id: job_id.to_string(),
        })?;

        let mut summary = RunSummary {
            job_id: job_id.to_string(),
            success: false,
            error: None,
            stages_completed: Vec::new(),
        };

        let stages: Vec<String> = manager
            .plan()
            .analysis_stages()
            .iter()
            .map(|s| s.name.clone())
            .collect();

        for stage in &stages {
            if self.cancelled.load(Ordering::SeqCst) {
                tracing::warn!(job = %job_id, stage, "analysis cancelled before stage");
                manager.cancel(job_id)?;
                summary.error = Some("cancelled".to_string());
                return Ok(summary);
            }

            let Some(analyzer) = self.analyzers.iter().find(|a| a.stage() == *stage) else {
                let reason = format!("no analyzer registered for stage '{}'", stage);
                manager.fail(job_id, reason.clone())?;
                summary.error = Some(reason);
                return Ok(summary);
            };

            tracing::debug!(job = %job_id, stage, "running analyzer");
            match analyzer.analyze(&snapshot.asset, (0.0, duration)) {
                Ok(findings) => {
                    manager.stage_complete(
                        job_id,
                        stage,
                        findings.segments,
                        findings.suggestions,
                    )?;
                    summary.stages_completed.push(stage.clone());
                }
                Err(e) => {
                    manager.fail(job_id, e.reason.clone())?;
                    summary.error = Some(e.reason);
                    return Ok(summary);
                }
            }
        }

        manager.finalize(job_id)?;
        summary.success = true;
        Ok(summary)
    }
}

impl Default for AnalysisRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SegmentDraft, SegmentKind, Suggestion, SuggestionKind};
    use crate::stages::{AnalyzerError, StageDefinition, StageFindings, StagePlan};

    struct OkAnalyzer {
        stage: &'static str,
        segment: Option<(f64, f64)>,
    }

    impl StageAnalyzer for OkAnalyzer {
        fn stage(&self) -> &str {
            self.stage
        }

        fn analyze(
            &self,
            _asset: &str,
            _range: (f64, f64),
        ) -> Result<StageFindings, AnalyzerError> {
            Ok(StageFindings {
                segments: self
                    .segment
                    .map(|(a, b)| SegmentDraft::new(a, b, SegmentKind::Scene, 0.9))
                    .into_iter()
                    .collect(),
                suggestions: vec![Suggestion::new(
                    SuggestionKind::Quality,
                    format!("{} finding", self.stage),
                    0.6,
                    self.stage,
                )],
            })
        }
    }

    struct FailingAnalyzer;

    impl StageAnalyzer for FailingAnalyzer {
        fn stage(&self) -> &str {
            "audio"
        }

        fn analyze(
            &self,
            _asset: &str,
            _range: (f64, f64),
        ) -> Result<StageFindings, AnalyzerError> {
            Err(AnalyzerError::new("device disconnected"))
        }
    }

    fn manager() -> JobManager {
        JobManager::new(
            StagePlan::new(vec![
                StageDefinition::new("transport", 15),
                StageDefinition::new("scene", 30),
                StageDefinition::new("audio", 25),
                StageDefinition::new("enhance", 30),
            ])
            .unwrap(),
        )
    }

    fn analyzing_job(manager: &JobManager) -> String {
        let id = manager.submit("asset-1").unwrap();
        manager.start(&id).unwrap();
        manager.transport_complete(&id, 120.0).unwrap();
        id
    }

    fn full_runner() -> AnalysisRunner {
        AnalysisRunner::new()
            .with_analyzer(OkAnalyzer {
                stage: "scene",
                segment: Some((0.0, 30.0)),
            })
            .with_analyzer(OkAnalyzer {
                stage: "audio",
                segment: Some((40.0, 50.0)),
            })
            .with_analyzer(OkAnalyzer {
                stage: "enhance",
                segment: None,
            })
    }

    #[test]
    fn run_completes_job() {
        let manager = manager();
        let id = analyzing_job(&manager);

        let summary = full_runner().run(&manager, &id).unwrap();
        assert!(summary.success);
        assert_eq!(summary.stages_completed, vec!["scene", "audio", "enhance"]);

        let snap = manager.snapshot(&id).unwrap();
        assert_eq!(snap.state, JobState::Completed);
        assert_eq!(snap.progress, 100.0);
        assert_eq!(snap.segments.len(), 2);
        assert_eq!(snap.suggestions.len(), 3);
    }

    #[test]
    fn analyzer_failure_fails_job() {
        let manager = manager();
        let id = analyzing_job(&manager);

        let runner = AnalysisRunner::new()
            .with_analyzer(OkAnalyzer {
                stage: "scene",
                segment: Some((0.0, 30.0)),
            })
            .with_analyzer(FailingAnalyzer)
            .with_analyzer(OkAnalyzer {
                stage: "enhance",
                segment: None,
            });

        let summary = runner.run(&manager, &id).unwrap();
        assert!(!summary.success);
        assert_eq!(summary.error.as_deref(), Some("device disconnected"));
        assert_eq!(summary.stages_completed, vec!["scene"]);

        let snap = manager.snapshot(&id).unwrap();
        assert_eq!(snap.state, JobState::Failed);
        // Findings from the completed scene stage are retained.
        assert_eq!(snap.segments.len(), 1);
    }

    #[test]
    fn missing_analyzer_fails_job() {
        let manager = manager();
        let id = analyzing_job(&manager);

        let runner = AnalysisRunner::new().with_analyzer(OkAnalyzer {
            stage: "scene",
            segment: None,
        });
        let summary = runner.run(&manager, &id).unwrap();
        assert!(!summary.success);
        assert!(summary.error.unwrap().contains("audio"));
        assert_eq!(manager.snapshot(&id).unwrap().state, JobState::Failed);
    }

    #[test]
    fn cancel_stops_at_stage_boundary() {
        let manager = manager();
        let id = analyzing_job(&manager);

        let runner = full_runner();
        runner.cancel_handle().cancel();

        let summary = runner.run(&manager, &id).unwrap();
        assert!(!summary.success);
        assert_eq!(summary.error.as_deref(), Some("cancelled"));
        let snap = manager.snapshot(&id).unwrap();
        assert_eq!(snap.state, JobState::Failed);
        assert_eq!(snap.error.as_deref(), Some("cancelled"));
    }

    #[test]
    fn run_requires_analyzing_state() {
        let manager = manager();
        let id = manager.submit("asset-1").unwrap();
        let err = full_runner().run(&manager, &id).unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }
}
