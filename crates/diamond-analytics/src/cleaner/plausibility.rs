//! Physical sanity rules for stone measurements.

use crate::config::PipelineConfig;
use crate::dataset::{Dataset, DiamondRecord};
use crate::types::{FilterReport, RuleRemoval};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single plausibility rule. Rules run in the order of [`PlausibilityRule::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlausibilityRule {
    /// x, y and z must all be positive.
    NonPositiveDimensions,
    /// x, y and z must not exceed the dimension limit.
    OversizedDimensions,
    /// A small stone cannot be taller than the height limit.
    ImplausibleHeight,
    /// Declared depth must agree with the depth computed from x, y, z.
    DepthMismatch,
}

impl PlausibilityRule {
    pub const ALL: [PlausibilityRule; 4] = [
        Self::NonPositiveDimensions,
        Self::OversizedDimensions,
        Self::ImplausibleHeight,
        Self::DepthMismatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::NonPositiveDimensions => "non_positive_dimensions",
            Self::OversizedDimensions => "oversized_dimensions",
            Self::ImplausibleHeight => "implausible_height",
            Self::DepthMismatch => "depth_mismatch",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NonPositiveDimensions => "zero or negative dimensions",
            Self::OversizedDimensions => "dimensions above the size limit",
            Self::ImplausibleHeight => "small stones with impossible height",
            Self::DepthMismatch => "declared depth inconsistent with dimensions",
        }
    }

    /// Columns the rule reads.
    pub fn column_scope(&self) -> &'static str {
        match self {
            Self::NonPositiveDimensions | Self::OversizedDimensions => "x, y, z",
            Self::ImplausibleHeight => "carat, z",
            Self::DepthMismatch => "x, y, z, depth",
        }
    }
}

/// Applies the plausibility rules with thresholds taken from the config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibilityFilter {
    max_dimension_mm: f64,
    small_stone_carat: f64,
    max_small_stone_height_mm: f64,
    max_depth_deviation: f64,
}

impl Default for PlausibilityFilter {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PlausibilityFilter {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_dimension_mm: config.max_dimension_mm,
            small_stone_carat: config.small_stone_carat,
            max_small_stone_height_mm: config.max_small_stone_height_mm,
            max_depth_deviation: config.max_depth_deviation,
        }
    }

    /// Whether `record` passes `rule`.
    pub fn keeps(&self, rule: PlausibilityRule, record: &DiamondRecord) -> bool {
        let dims = [record.x, record.y, record.z];
        match rule {
            PlausibilityRule::NonPositiveDimensions => dims.iter().all(|d| *d > 0.0),
            PlausibilityRule::OversizedDimensions => {
                dims.iter().all(|d| *d <= self.max_dimension_mm)
            }
            PlausibilityRule::ImplausibleHeight => {
                !(record.carat < self.small_stone_carat
                    && record.z > self.max_small_stone_height_mm)
            }
            PlausibilityRule::DepthMismatch => record.depth_diff() <= self.max_depth_deviation,
        }
    }

    /// Whether `record` passes every rule.
    pub fn is_plausible(&self, record: &DiamondRecord) -> bool {
        PlausibilityRule::ALL
            .iter()
            .all(|rule| self.keeps(*rule, record))
    }

    /// Run every rule in order, counting removals against the dataset as it
    /// stood right before each rule.
    pub fn apply(&self, dataset: Dataset) -> (Dataset, FilterReport) {
        let rows_before = dataset.len();
        let mut removals = Vec::with_capacity(PlausibilityRule::ALL.len());
        let mut current = dataset;

        for rule in PlausibilityRule::ALL {
            let before = current.len();
            current = current.retain(|record| self.keeps(rule, record));
            let removed = before - current.len();
            debug!("{}: removed {} rows", rule.name(), removed);
            removals.push(RuleRemoval { rule, removed });
        }

        let report = FilterReport {
            rows_before,
            rows_after: current.len(),
            removals,
        };
        (current, report)
    }
}
