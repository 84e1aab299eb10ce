//! Per-job suggestion aggregation.

mod set;

pub use set::{SuggestionError, SuggestionResult, SuggestionSet};
