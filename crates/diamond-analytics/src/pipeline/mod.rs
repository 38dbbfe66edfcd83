//! Pipeline module.
//!
//! This module provides the pipeline orchestrator, progress reporting and
//! the cleaning cache.

mod builder;
pub mod cache;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, RANKED_ATTRIBUTES};
pub use cache::{CacheKey, CleaningCache};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
