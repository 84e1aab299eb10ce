//! Job lifecycle events pushed to observers.

use super::job::JobState;

/// Event emitted by the job manager on transitions and progress updates.
///
/// Callbacks run on the emitting thread with the observer list read
/// lock held, so they should be quick and must not subscribe new
/// observers from inside the callback.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// A job was created for an asset.
    Submitted { job_id: String, asset: String },
    /// A job moved between states.
    StateChanged {
        job_id: String,
        from: JobState,
        to: JobState,
    },
    /// A job's progress value changed.
    Progress { job_id: String, percent: f64 },
    /// A job reached `completed`.
    Completed { job_id: String },
    /// A job reached `failed`.
    Failed { job_id: String, reason: String },
}

impl JobEvent {
    /// The id of the job this event concerns.
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Submitted { job_id, .. }
            | JobEvent::StateChanged { job_id, .. }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id }
            | JobEvent::Failed { job_id, .. } => job_id,
        }
    }
}

/// Observer callback type for job events.
pub type JobObserver = Box<dyn Fn(&JobEvent) + Send + Sync>;
