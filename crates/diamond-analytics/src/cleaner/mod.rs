//! Data cleaning: plausibility rules followed by grade normalization.
//!
//! This module provides:
//! - [`PlausibilityFilter`]: physical sanity rules with per-rule removal counts
//! - [`CategoryNormalizer`]: the switchable grade enumeration check
//! - [`DataCleaner`]: both stages in order, driven by [`PipelineConfig`]

pub mod normalizer;
pub mod plausibility;

pub use normalizer::CategoryNormalizer;
pub use plausibility::{PlausibilityFilter, PlausibilityRule};

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::types::{FilterReport, NormalizationReport};
use tracing::info;

/// Runs every cleaning stage over a validated dataset.
#[derive(Debug, Clone, Copy)]
pub struct DataCleaner {
    filter: PlausibilityFilter,
    normalizer: CategoryNormalizer,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl DataCleaner {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            filter: PlausibilityFilter::from_config(config),
            normalizer: CategoryNormalizer::new(config.enforce_grade_enumerations),
        }
    }

    pub fn filter(&self) -> &PlausibilityFilter {
        &self.filter
    }

    /// Plausibility filter, then category normalizer.
    pub fn clean(&self, dataset: Dataset) -> (Dataset, FilterReport, NormalizationReport) {
        info!("Cleaning {} rows...", dataset.len());

        let (filtered, filter_report) = self.filter.apply(dataset);
        let (normalized, normalization) = self.normalizer.apply(filtered);

        info!(
            "Cleaning removed {} implausible and {} ungraded rows; {} remain",
            filter_report.total_removed(),
            normalization.removed,
            normalized.len()
        );
        (normalized, filter_report, normalization)
    }
}
