//! Job lifecycle: the state machine, the manager that coordinates
//! concurrent jobs, and the runner that drives analyzers.

mod errors;
mod events;
mod job;
mod manager;
mod runner;

pub use errors::{JobError, JobResult};
pub use events::{JobEvent, JobObserver};
pub use job::{Job, JobSnapshot, JobState};
pub use manager::JobManager;
pub use runner::{AnalysisRunner, CancelHandle, RunSummary};
