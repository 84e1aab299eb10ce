//! Settings struct with TOML-based sections.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::stages::{StageDefinition, StagePlan, StageResult};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Stage-weight table (`[[stages]]` in TOML). Loaded once at process
    /// start; `stage_plan()` validates it before any job runs.
    #[serde(default = "default_stage_table")]
    pub stages: Vec<StageWeight>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            stages: default_stage_table(),
        }
    }
}

impl Settings {
    /// Build the validated stage plan from the configured table.
    pub fn stage_plan(&self) -> StageResult<StagePlan> {
        StagePlan::new(
            self.stages
                .iter()
                .map(|s| StageDefinition::new(&s.name, s.weight))
                .collect(),
        )
    }
}

/// One entry in the configured stage-weight table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageWeight {
    /// Stage name.
    pub name: String,
    /// Progress weight; all weights sum to 100.
    pub weight: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum log level for the tracing subscriber.
    #[serde(default)]
    pub level: LogLevel,
    /// Show timestamps in log output.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            show_timestamps: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stage_table() -> Vec<StageWeight> {
    StagePlan::standard()
        .stages()
        .iter()
        .map(|s| StageWeight {
            name: s.name.clone(),
            weight: s.weight,
        })
        .collect()
}
