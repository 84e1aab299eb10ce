//! Error types for job lifecycle operations.
//!
//! Errors carry context that chains through layers:
//! Job → transition → component detail.

use thiserror::Error;

use crate::stages::StageError;
use crate::suggestions::SuggestionError;
use crate::timeline::TimelineError;

use super::job::JobState;

/// Errors from job transitions and manager operations.
#[derive(Error, Debug)]
pub enum JobError {
    /// Another job for the same asset is already active.
    #[error("asset '{asset}' already has a job in progress")]
    AlreadyProcessing { asset: String },

    /// The event is not valid in the job's current state.
    #[error("job '{id}' cannot handle {event} while {state}")]
    InvalidTransition {
        id: String,
        state: JobState,
        event: String,
    },

    /// The job is in a terminal state; no further mutation is permitted.
    #[error("job '{id}' is {state} and can no longer change")]
    Terminal { id: String, state: JobState },

    /// No job with the given id exists.
    #[error("no job with id '{id}'")]
    UnknownJob { id: String },

    /// The asset duration has not been supplied yet.
    #[error("job '{id}' has no duration yet (transport not complete)")]
    DurationUnknown { id: String },

    /// The transport collaborator supplied an unusable duration.
    #[error("invalid asset duration {value} seconds")]
    InvalidDuration { value: f64 },

    /// Segment index error during stage application or lookup.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Stage table lookup or configuration error.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Suggestion aggregation error.
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),
}

impl JobError {
    /// Create an already-processing error.
    pub fn already_processing(asset: impl Into<String>) -> Self {
        Self::AlreadyProcessing {
            asset: asset.into(),
        }
    }

    /// Create an invalid-transition error.
    pub fn invalid_transition(
        id: impl Into<String>,
        state: JobState,
        event: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            state,
            event: event.into(),
        }
    }

    /// Create a terminal-state error.
    pub fn terminal(id: impl Into<String>, state: JobState) -> Self {
        Self::Terminal {
            id: id.into(),
            state,
        }
    }

    /// Create an unknown-job error.
    pub fn unknown_job(id: impl Into<String>) -> Self {
        Self::UnknownJob { id: id.into() }
    }
}

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;
