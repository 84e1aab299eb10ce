//! Stage definitions, the progress engine, and the analyzer seam.
//!
//! A stage is one named unit of work with a fixed progress weight. The
//! first stage in a plan is always the transport stage; the rest are
//! analysis stages driven by `StageAnalyzer` implementations.

mod analyzer;
mod plan;
mod progress;

pub use analyzer::{AnalyzerError, StageAnalyzer, StageFindings};
pub use plan::{StageDefinition, StageError, StagePlan, StageResult};
pub use progress::ProgressEngine;
