//! Restricts categorical values to the known grading scales.

use crate::dataset::Dataset;
use crate::types::NormalizationReport;
use tracing::debug;

/// Drops records whose cut, color or clarity is outside its scale.
///
/// When disabled the dataset passes through untouched and the report
/// records the stage as skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryNormalizer {
    enabled: bool,
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl CategoryNormalizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn apply(&self, dataset: Dataset) -> (Dataset, NormalizationReport) {
        if !self.enabled {
            debug!("Grade enumeration check disabled; skipping");
            return (dataset, NormalizationReport { enabled: false, removed: 0 });
        }

        let before = dataset.len();
        let kept = dataset.retain(|record| record.has_known_grades());
        let removed = before - kept.len();
        debug!("Removed {} rows with unlisted grades", removed);

        (kept, NormalizationReport { enabled: true, removed })
    }
}
