//! Diamond Analytics Library
//!
//! Cleaning and opportunity ranking for diamond price lists, built with Rust
//! and Polars.
//!
//! # Overview
//!
//! - **Validation**: decodes raw uploads, detects the delimiter, checks the
//!   schema and drops incomplete rows
//! - **Cleaning**: physical plausibility rules with per-rule removal counts,
//!   plus an optional grade enumeration check
//! - **Underpriced detection**: stones priced below the median of their
//!   peer group (carat bin plus grades)
//! - **Volatility ranking**: grade values whose prices vary the most within
//!   narrow carat bands
//! - **Reporting**: JSON reports and CSV exports
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use diamond_analytics::{CategoricalAttribute, PipelineConfig};
//!
//! let raw = std::fs::read("diamonds.csv")?;
//! let config = PipelineConfig::default();
//!
//! let cleaned = diamond_analytics::validate_and_clean(&raw, &config)?;
//! let deals = diamond_analytics::find_underpriced(
//!     &cleaned.dataset,
//!     &[CategoricalAttribute::Color, CategoricalAttribute::Clarity, CategoricalAttribute::Cut],
//!     &config,
//! );
//! let volatile = diamond_analytics::rank_volatility(
//!     &cleaned.dataset,
//!     "color".parse()?,
//!     &config,
//! );
//! ```
//!
//! Or run everything at once with progress reporting:
//!
//! ```rust,ignore
//! use diamond_analytics::Pipeline;
//!
//! let report = Pipeline::builder()
//!     .on_progress(|update| println!("[{:?}] {}", update.stage, update.message))
//!     .build()?
//!     .run(&raw)?;
//!
//! for warning in &report.warnings {
//!     println!("{}", warning.message());
//! }
//! ```
//!
//! # Errors
//!
//! Only undecodable input ([`PipelineError::Encoding`]) and missing columns
//! ([`PipelineError::Schema`]) stop a run. Implausible rows are removed
//! silently, and empty outcomes surface as [`EmptyResultWarning`]s.

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod error;
pub mod grades;
pub mod ingest;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

pub use analysis::{
    CaratBin, CaratBins, Detection, PeerGroupBucketizer, UnderpricedDetector, VolatilityRanker,
};
pub use cleaner::{CategoryNormalizer, DataCleaner, PlausibilityFilter, PlausibilityRule};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use dataset::{Dataset, DiamondRecord};
pub use error::{EmptyResultWarning, PipelineError, Result, ResultExt};
pub use grades::{
    AttributeSelection, CategoricalAttribute, Clarity, Color, Cut, Grade, GradeValue, Graded,
    TargetProfile,
};
pub use ingest::RecordValidator;
pub use pipeline::{
    CacheKey, CleaningCache, ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use reporting::{AnalysisReport, ReportGenerator};
pub use types::{
    BinVolatility, CleanedDataset, FilterReport, InvestmentSummary, PipelineReport, RuleRemoval,
    UnderpricedCandidate, ValidationReport, VolatilityEntry, VolatilityRanking,
};

/// Validate raw bytes and run every cleaning stage.
///
/// # Errors
///
/// [`PipelineError::Encoding`] for binary input, [`PipelineError::Schema`]
/// when required columns are missing.
pub fn validate_and_clean(raw: &[u8], config: &PipelineConfig) -> Result<CleanedDataset> {
    let (dataset, validation) = RecordValidator::new().validate(raw)?;
    let (dataset, filter, normalization) = DataCleaner::from_config(config).clean(dataset);
    Ok(CleanedDataset {
        dataset,
        validation,
        filter,
        normalization,
    })
}

/// Stones priced below their peer-group median, largest gap first.
///
/// Not truncated; the pipeline applies `candidate_limit`.
pub fn find_underpriced(
    dataset: &Dataset,
    group_by: &[CategoricalAttribute],
    config: &PipelineConfig,
) -> Vec<UnderpricedCandidate> {
    UnderpricedDetector::from_config(config).detect(dataset, group_by)
}

/// Grade values most often among the most volatile in a carat bin, capped at
/// `config.ranking_limit`.
pub fn rank_volatility(
    dataset: &Dataset,
    attribute: CategoricalAttribute,
    config: &PipelineConfig,
) -> Vec<VolatilityEntry> {
    VolatilityRanker::from_config(config).rank(dataset, attribute)
}
