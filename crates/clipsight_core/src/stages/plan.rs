//! Validated stage-weight table.
//!
//! The plan is loaded once at process start (usually from `Settings`),
//! validated, and never mutated afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of stages; completion is tracked in a u64 bitmask.
const MAX_STAGES: usize = 63;

/// Errors from stage-table configuration and lookups.
#[derive(Error, Debug)]
pub enum StageError {
    /// A stage name not present in the plan.
    #[error("unknown stage '{name}'")]
    UnknownStage { name: String },

    /// The stage table failed validation at load time.
    #[error("invalid stage plan: {message}")]
    InvalidStagePlan { message: String },
}

impl StageError {
    /// Create an unknown-stage error.
    pub fn unknown_stage(name: impl Into<String>) -> Self {
        Self::UnknownStage { name: name.into() }
    }

    /// Create an invalid-plan error.
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidStagePlan {
            message: message.into(),
        }
    }
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

/// One named unit of work with a fixed progress weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage name (unique within a plan).
    pub name: String,
    /// Progress weight; weights over all stages sum to 100.
    pub weight: u32,
}

impl StageDefinition {
    /// Create a stage definition.
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Immutable, validated sequence of stage definitions.
///
/// The first stage is the transport stage; the remaining stages are
/// analysis stages executed after transport completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    stages: Vec<StageDefinition>,
}

impl StagePlan {
    /// Build a plan from stage definitions, validating the table.
    ///
    /// Validation failures are configuration errors, not runtime faults:
    /// the table needs at least a transport stage and one analysis stage,
    /// unique non-empty names, and weights summing to exactly 100.
    pub fn new(stages: Vec<StageDefinition>) -> StageResult<Self> {
        if stages.len() < 2 {
            return Err(StageError::invalid_plan(
                "plan needs a transport stage and at least one analysis stage",
            ));
        }
        if stages.len() > MAX_STAGES {
            return Err(StageError::invalid_plan(format!(
                "plan has {} stages, maximum is {}",
                stages.len(),
                MAX_STAGES
            )));
        }
        for (i, stage) in stages.iter().enumerate() {
            if stage.name.is_empty() {
                return Err(StageError::invalid_plan(format!(
                    "stage at position {} has an empty name",
                    i
                )));
            }
            if stages[..i].iter().any(|s| s.name == stage.name) {
                return Err(StageError::invalid_plan(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }
        }
        let total: u32 = stages.iter().map(|s| s.weight).sum();
        if total != 100 {
            return Err(StageError::invalid_plan(format!(
                "stage weights sum to {}, expected 100",
                total
            )));
        }
        Ok(Self { stages })
    }

    /// Default plan matching the standard analyzer set.
    pub fn standard() -> Self {
        // Static table; the totals are checked by `new` in tests.
        Self {
            stages: vec![
                StageDefinition::new("transport", 10),
                StageDefinition::new("scene", 25),
                StageDefinition::new("audio", 20),
                StageDefinition::new("color", 15),
                StageDefinition::new("motion", 15),
                StageDefinition::new("quality", 15),
            ],
        }
    }

    /// All stages in execution order.
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// The transport stage (always first).
    pub fn transport(&self) -> &StageDefinition {
        &self.stages[0]
    }

    /// Analysis stages (everything after transport).
    pub fn analysis_stages(&self) -> &[StageDefinition] {
        &self.stages[1..]
    }

    /// Number of stages, transport included.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the plan is empty (never true for a validated plan).
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Position of a stage by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }

    /// Look up a stage by name.
    pub fn get(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Bitmask with every analysis stage bit set (transport excluded).
    pub fn analysis_mask(&self) -> u64 {
        ((1u64 << self.stages.len()) - 1) & !1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_plan_is_valid() {
        let plan = StagePlan::new(StagePlan::standard().stages().to_vec()).unwrap();
        assert_eq!(plan.transport().name, "transport");
        assert_eq!(plan.analysis_stages().len(), 5);
    }

    #[test]
    fn weights_must_sum_to_100() {
        let err = StagePlan::new(vec![
            StageDefinition::new("transport", 20),
            StageDefinition::new("scene", 30),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("sum to 50"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = StagePlan::new(vec![
            StageDefinition::new("transport", 50),
            StageDefinition::new("transport", 50),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn single_stage_plan_rejected() {
        let err = StagePlan::new(vec![StageDefinition::new("transport", 100)]).unwrap_err();
        assert!(matches!(err, StageError::InvalidStagePlan { .. }));
    }

    #[test]
    fn index_and_lookup() {
        let plan = StagePlan::standard();
        assert_eq!(plan.index_of("scene"), Some(1));
        assert_eq!(plan.index_of("nope"), None);
        assert_eq!(plan.get("audio").map(|s| s.weight), Some(20));
    }

    #[test]
    fn analysis_mask_excludes_transport() {
        let plan = StagePlan::new(vec![
            StageDefinition::new("transport", 15),
            StageDefinition::new("scene", 30),
            StageDefinition::new("audio", 25),
            StageDefinition::new("enhance", 30),
        ])
        .unwrap();
        assert_eq!(plan.analysis_mask(), 0b1110);
    }
}
