use crate::analysis::binning::CaratBin;
use crate::cleaner::plausibility::PlausibilityRule;
use crate::dataset::{Dataset, DiamondRecord};
use crate::error::EmptyResultWarning;
use crate::grades::{CategoricalAttribute, GradeValue};
use serde::{Deserialize, Serialize};

// ============================================================================
// Cleaning Reports
// ============================================================================

/// What the record validator saw while reading the raw table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Data rows read from the input (blank lines excluded).
    pub rows_read: usize,
    /// Rows dropped for a null, empty or error-marker value.
    pub rows_dropped_incomplete: usize,
    /// Rows dropped for an unparseable or non-positive numeric value.
    pub rows_dropped_invalid: usize,
    /// Rows that became records.
    pub rows_accepted: usize,
    /// Field delimiter that was detected.
    pub delimiter: char,
    /// Whether ids were generated from row position.
    pub ids_synthesized: bool,
}

/// Rows removed by a single plausibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRemoval {
    pub rule: PlausibilityRule,
    /// Measured against the dataset immediately before the rule ran.
    pub removed: usize,
}

/// Per-rule diagnostics of the plausibility filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// One entry per rule, in evaluation order.
    pub removals: Vec<RuleRemoval>,
}

impl FilterReport {
    pub fn total_removed(&self) -> usize {
        self.removals.iter().map(|r| r.removed).sum()
    }

    /// Rows removed by `rule`, or zero if the rule did not run.
    pub fn removed_by(&self, rule: PlausibilityRule) -> usize {
        self.removals
            .iter()
            .find(|r| r.rule == rule)
            .map_or(0, |r| r.removed)
    }
}

/// Outcome of the category normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// False when the stage was switched off and skipped.
    pub enabled: bool,
    pub removed: usize,
}

/// The output of validation and cleaning: the clean dataset and how it was
/// obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDataset {
    pub dataset: Dataset,
    pub validation: ValidationReport,
    pub filter: FilterReport,
    pub normalization: NormalizationReport,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Audit trail of what cleaning did, in stage order.
    pub fn actions(&self) -> Vec<CleaningAction> {
        let mut actions = Vec::new();
        let v = &self.validation;

        actions.push(
            CleaningAction::new(
                ActionType::DelimiterDetected,
                "dataset",
                format!("Parsed {} rows using '{}' as delimiter", v.rows_read, v.delimiter.escape_default()),
            ),
        );
        if v.ids_synthesized {
            actions.push(CleaningAction::new(
                ActionType::IdsSynthesized,
                "id",
                "No identifier column found; ids assigned from row position",
            ));
        }
        if v.rows_dropped_incomplete > 0 {
            actions.push(CleaningAction::new(
                ActionType::RowsRemoved,
                "dataset",
                format!("Removed {} rows with missing values", v.rows_dropped_incomplete),
            ));
        }
        if v.rows_dropped_invalid > 0 {
            actions.push(CleaningAction::new(
                ActionType::RowsRemoved,
                "dataset",
                format!("Removed {} rows with invalid numeric values", v.rows_dropped_invalid),
            ));
        }

        for removal in self.filter.removals.iter().filter(|r| r.removed > 0) {
            actions.push(
                CleaningAction::new(
                    ActionType::RowsFiltered,
                    removal.rule.column_scope(),
                    format!("Removed {} rows: {}", removal.removed, removal.rule.description()),
                )
                .with_details(removal.rule.name()),
            );
        }

        if !self.normalization.enabled {
            actions.push(CleaningAction::new(
                ActionType::CategoriesRestricted,
                "cut, color, clarity",
                "Grade enumeration check skipped",
            ));
        } else if self.normalization.removed > 0 {
            actions.push(CleaningAction::new(
                ActionType::CategoriesRestricted,
                "cut, color, clarity",
                format!(
                    "Removed {} rows with grades outside the known scales",
                    self.normalization.removed
                ),
            ));
        }

        actions
    }
}

/// A single step taken during cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name(s) or "dataset".
    pub target: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Kinds of cleaning steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DelimiterDetected,
    IdsSynthesized,
    RowsRemoved,
    RowsFiltered,
    CategoriesRestricted,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DelimiterDetected => "Delimiter Detected",
            Self::IdsSynthesized => "Ids Synthesized",
            Self::RowsRemoved => "Rows Removed",
            Self::RowsFiltered => "Rows Filtered",
            Self::CategoriesRestricted => "Categories Restricted",
        }
    }
}

// ============================================================================
// Analysis Results
// ============================================================================

/// A stone priced below the median of its peer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderpricedCandidate {
    #[serde(flatten)]
    pub record: DiamondRecord,
    /// Grade labels of the peer group, comma-joined in grouping order.
    pub group_key: String,
    pub carat_bin: CaratBin,
    pub peer_median_price: f64,
    /// `peer_median_price - price`, rounded to 2 places.
    pub deviation_amount: f64,
    /// Deviation as a percentage of the median, rounded to 1 place.
    pub deviation_percent: f64,
    pub peer_group_size: usize,
    /// Whether every grade of the stone is in the target profile.
    pub in_target_profile: bool,
}

/// How often an attribute value ranked among the most volatile in a carat bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityEntry {
    pub attribute: CategoricalAttribute,
    pub value: GradeValue,
    /// Number of carat bins in which the value was among the top-K.
    pub frequency: usize,
    pub in_target_profile: bool,
}

/// Price dispersion of one (carat bin, attribute value) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinVolatility {
    pub carat_bin: CaratBin,
    pub value: GradeValue,
    pub samples: usize,
    pub mean_price: f64,
    pub std_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Coefficient of variation, `std_price / mean_price`.
    pub variation: f64,
}

/// The volatility ranking for a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityRanking {
    pub attribute: CategoricalAttribute,
    pub entries: Vec<VolatilityEntry>,
}

/// Purchase and resale totals over a set of candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSummary {
    pub candidates: usize,
    pub total_investment: f64,
    /// Profit if every stone resells at its peer median.
    pub profit_at_median: f64,
    /// Profit if every stone resells at median plus `resale_markup`.
    pub profit_at_markup: f64,
    pub resale_markup: f64,
}

// ============================================================================
// Pipeline Report
// ============================================================================

/// Everything a pipeline run produced.
///
/// # Example
///
/// ```rust,ignore
/// let report = pipeline.run(&bytes)?;
/// for warning in &report.warnings {
///     println!("{}", warning.message());
/// }
/// println!("{} candidates", report.candidates.len());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    pub rows_read: usize,
    pub rows_clean: usize,
    /// Clean rows left after the attribute selection.
    pub rows_selected: usize,
    pub validation: ValidationReport,
    pub filter: FilterReport,
    pub normalization: NormalizationReport,
    pub cleaning_actions: Vec<CleaningAction>,
    /// Underpriced stones, best deal first, truncated to the candidate limit.
    pub candidates: Vec<UnderpricedCandidate>,
    pub rankings: Vec<VolatilityRanking>,
    pub summary: InvestmentSummary,
    /// Stages that finished without producing anything.
    pub warnings: Vec<EmptyResultWarning>,
}

impl PipelineReport {
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn ranking(&self, attribute: CategoricalAttribute) -> Option<&VolatilityRanking> {
        self.rankings.iter().find(|r| r.attribute == attribute)
    }
}
