//! Analyzer trait: the seam where real signal analysis plugs in.

use thiserror::Error;

use crate::models::{SegmentDraft, Suggestion};

/// Failure reported by an analyzer. The reason string is consumed by
/// the owning job's `fail` transition.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct AnalyzerError {
    /// Human-readable failure reason.
    pub reason: String,
}

impl AnalyzerError {
    /// Create an analyzer error with a reason string.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Findings produced by one stage run.
#[derive(Debug, Clone, Default)]
pub struct StageFindings {
    /// Timeline segments to insert into the job's index.
    pub segments: Vec<SegmentDraft>,
    /// Suggestions to append to the job.
    pub suggestions: Vec<Suggestion>,
}

/// One per-stage analyzer collaborator (scene, audio, color, motion,
/// quality). Implementations perform the actual analysis work, which is
/// outside the core; the core only consumes their findings.
///
/// Every invocation must end in either returned findings or an error —
/// the runner translates these into `stage_complete` or `fail`, so a job
/// never sticks in a non-terminal state.
pub trait StageAnalyzer: Send + Sync {
    /// Name of the plan stage this analyzer fulfils.
    fn stage(&self) -> &str;

    /// Analyze the asset over `[range.0, range.1)` seconds.
    fn analyze(&self, asset: &str, range: (f64, f64)) -> Result<StageFindings, AnalyzerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SegmentKind, SuggestionKind};

    struct FixedAnalyzer;

    impl StageAnalyzer for FixedAnalyzer {
        fn stage(&self) -> &str {
            "scene"
        }

        fn analyze(
            &self,
            _asset: &str,
            range: (f64, f64),
        ) -> Result<StageFindings, AnalyzerError> {
            Ok(StageFindings {
                segments: vec![SegmentDraft::new(
                    range.0,
                    range.1 / 2.0,
                    SegmentKind::Scene,
                    0.8,
                )],
                suggestions: vec![Suggestion::new(
                    SuggestionKind::Cut,
                    "Trim opening",
                    0.7,
                    "scene",
                )],
            })
        }
    }

    #[test]
    fn analyzer_trait_object_works() {
        let analyzer: Box<dyn StageAnalyzer> = Box::new(FixedAnalyzer);
        assert_eq!(analyzer.stage(), "scene");
        let findings = analyzer.analyze("asset-1", (0.0, 60.0)).unwrap();
        assert_eq!(findings.segments.len(), 1);
        assert_eq!(findings.suggestions.len(), 1);
    }

    #[test]
    fn analyzer_error_carries_reason() {
        let err = AnalyzerError::new("device disconnected");
        assert_eq!(err.to_string(), "device disconnected");
    }
}
