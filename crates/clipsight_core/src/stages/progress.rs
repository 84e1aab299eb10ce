//! Progress computation over the stage-weight table.

use std::sync::Arc;

use super::plan::{StageError, StagePlan, StageResult};

/// Pure helper that maps stage completions onto a bounded progress value.
///
/// Holds only the shared weight table; all methods are read-only. The
/// completion bitmask is indexed by stage position in the plan.
#[derive(Debug, Clone)]
pub struct ProgressEngine {
    plan: Arc<StagePlan>,
}

impl ProgressEngine {
    /// Create an engine over a shared stage plan.
    pub fn new(plan: Arc<StagePlan>) -> Self {
        Self { plan }
    }

    /// The underlying plan.
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Weight of a stage by name.
    pub fn weight_of(&self, name: &str) -> StageResult<u32> {
        self.plan
            .get(name)
            .map(|s| s.weight)
            .ok_or_else(|| StageError::unknown_stage(name))
    }

    /// Cumulative weight through a stage, inclusive: the progress value a
    /// job shows once that stage and every stage before it completed.
    pub fn cumulative_through(&self, name: &str) -> StageResult<u32> {
        let at = self
            .plan
            .index_of(name)
            .ok_or_else(|| StageError::unknown_stage(name))?;
        Ok(self.plan.stages()[..=at].iter().map(|s| s.weight).sum())
    }

    /// Total weight of the stages set in a completion bitmask.
    pub fn completed_weight(&self, mask: u64) -> f64 {
        self.plan
            .stages()
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, s)| s.weight as f64)
            .sum()
    }

    /// Progress given completed stages plus an in-flight stage's
    /// fractional completion (0..1), clamped to `[0, 100]`.
    pub fn progress(
        &self,
        mask: u64,
        in_flight: Option<(&str, f64)>,
    ) -> StageResult<f64> {
        let mut value = self.completed_weight(mask);
        if let Some((name, fraction)) = in_flight {
            let weight = self.weight_of(name)?;
            value += fraction.clamp(0.0, 1.0) * weight as f64;
        }
        Ok(value.clamp(0.0, 100.0))
    }
}
