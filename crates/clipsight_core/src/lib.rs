//! Clipsight Core - media analysis job orchestration
//!
//! This crate contains the job processing state machine, progress
//! engine, timeline segment index, and suggestion aggregation, with no
//! UI or transport dependencies. Transport and analyzer collaborators
//! drive jobs through `jobs::JobManager`; presentation layers read
//! `jobs::JobSnapshot` projections.

pub mod config;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod stages;
pub mod suggestions;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
