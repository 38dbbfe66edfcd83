//! Configuration types for the diamond analytics pipeline.
//!
//! Every tunable of the pipeline lives here so the core can be driven and
//! tested without a UI. Use [`PipelineConfig::builder()`] for a validated
//! configuration, or deserialize one from JSON.

use crate::grades::{AttributeSelection, CategoricalAttribute, TargetProfile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use diamond_analytics::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .detector_bin_width(0.01)
///     .min_group_size(12)
///     .candidate_limit(25)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest plausible x/y/z dimension in millimeters.
    /// Default: 15.0
    pub max_dimension_mm: f64,

    /// Stones lighter than this (carat) are checked against
    /// `max_small_stone_height_mm`.
    /// Default: 1.0
    pub small_stone_carat: f64,

    /// Largest plausible height (z) for a stone under `small_stone_carat`.
    /// Default: 10.0
    pub max_small_stone_height_mm: f64,

    /// Largest allowed gap between declared and computed depth,
    /// in percentage points.
    /// Default: 1.0
    pub max_depth_deviation: f64,

    /// Whether to drop rows whose cut/color/clarity is outside the scales.
    /// Default: true
    pub enforce_grade_enumerations: bool,

    /// Lower edge of the analysed weight range (exclusive for binning).
    /// Default: 0.1
    pub min_carat: f64,

    /// Upper edge of the analysed weight range (inclusive).
    /// Default: 1.0
    pub max_carat: f64,

    /// Carat bin width used by the underpriced detector.
    /// Default: 0.1
    pub detector_bin_width: f64,

    /// Carat bin width used by the volatility ranker.
    /// Default: 0.01
    pub volatility_bin_width: f64,

    /// Smallest peer group that is reported.
    /// Default: 10
    pub min_group_size: usize,

    /// Attribute values kept per carat bin by the volatility ranker.
    /// Default: 3
    pub volatility_top_k: usize,

    /// Number of attribute values returned by a volatility ranking.
    /// Default: 3
    pub ranking_limit: usize,

    /// Number of underpriced candidates kept by the pipeline.
    /// Default: 50
    pub candidate_limit: usize,

    /// Attributes defining a peer group, in key order.
    /// Default: color, clarity, cut
    pub group_by: Vec<CategoricalAttribute>,

    /// Markup above median used for the optimistic resale estimate.
    /// Default: 0.10
    pub resale_markup: f64,

    /// Grades demanded by the target clientele.
    pub target_profile: TargetProfile,

    /// Allow-lists applied to the clean dataset before detection.
    pub selection: AttributeSelection,

    /// Output directory for reports and exports.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Custom output file stem. If None, uses "diamonds".
    pub output_name: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension_mm: 15.0,
            small_stone_carat: 1.0,
            max_small_stone_height_mm: 10.0,
            max_depth_deviation: 1.0,
            enforce_grade_enumerations: true,
            min_carat: 0.1,
            max_carat: 1.0,
            detector_bin_width: 0.1,
            volatility_bin_width: 0.01,
            min_group_size: 10,
            volatility_top_k: 3,
            ranking_limit: 3,
            candidate_limit: 50,
            group_by: vec![
                CategoricalAttribute::Color,
                CategoricalAttribute::Clarity,
                CategoricalAttribute::Cut,
            ],
            resale_markup: 0.10,
            target_profile: TargetProfile::default(),
            selection: AttributeSelection::default(),
            output_dir: PathBuf::from("output"),
            output_name: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Output file stem.
    pub fn output_stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or("diamonds")
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("max_dimension_mm", self.max_dimension_mm),
            ("small_stone_carat", self.small_stone_carat),
            ("max_small_stone_height_mm", self.max_small_stone_height_mm),
            ("max_depth_deviation", self.max_depth_deviation),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigValidationError::NotPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if !(self.min_carat.is_finite() && self.min_carat >= 0.0)
            || !self.max_carat.is_finite()
            || self.min_carat >= self.max_carat
        {
            return Err(ConfigValidationError::InvalidCaratRange {
                min: self.min_carat,
                max: self.max_carat,
            });
        }

        let span = self.max_carat - self.min_carat;
        for (field, width) in [
            ("detector_bin_width", self.detector_bin_width),
            ("volatility_bin_width", self.volatility_bin_width),
        ] {
            if !(width.is_finite() && width > 0.0 && width <= span) {
                return Err(ConfigValidationError::InvalidBinWidth {
                    field: field.to_string(),
                    value: width,
                    span,
                });
            }
        }

        for (field, value) in [
            ("min_group_size", self.min_group_size),
            ("volatility_top_k", self.volatility_top_k),
            ("ranking_limit", self.ranking_limit),
            ("candidate_limit", self.candidate_limit),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        if !(self.resale_markup.is_finite() && self.resale_markup >= 0.0) {
            return Err(ConfigValidationError::InvalidMarkup(self.resale_markup));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be a positive number)")]
    NotPositive { field: String, value: f64 },

    #[error("Invalid carat range: {min}..{max} (min must be >= 0 and below max)")]
    InvalidCaratRange { min: f64, max: f64 },

    #[error("Invalid bin width for '{field}': {value} (must be in (0, {span}])")]
    InvalidBinWidth { field: String, value: f64, span: f64 },

    #[error("'{0}' must be at least 1")]
    ZeroCount(String),

    #[error("Invalid resale markup: {0} (must be >= 0)")]
    InvalidMarkup(f64),
}

impl From<ConfigValidationError> for crate::error::PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::PipelineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    base: Option<PipelineConfig>,
    max_dimension_mm: Option<f64>,
    max_depth_deviation: Option<f64>,
    enforce_grade_enumerations: Option<bool>,
    carat_range: Option<(f64, f64)>,
    detector_bin_width: Option<f64>,
    volatility_bin_width: Option<f64>,
    min_group_size: Option<usize>,
    volatility_top_k: Option<usize>,
    ranking_limit: Option<usize>,
    candidate_limit: Option<usize>,
    group_by: Option<Vec<CategoricalAttribute>>,
    resale_markup: Option<f64>,
    target_profile: Option<TargetProfile>,
    selection: Option<AttributeSelection>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON)
    /// instead of the defaults.
    pub fn base(mut self, config: PipelineConfig) -> Self {
        self.base = Some(config);
        self
    }

    /// Set the largest plausible stone dimension in millimeters.
    pub fn max_dimension_mm(mut self, value: f64) -> Self {
        self.max_dimension_mm = Some(value);
        self
    }

    /// Set the allowed gap between declared and computed depth.
    pub fn max_depth_deviation(mut self, value: f64) -> Self {
        self.max_depth_deviation = Some(value);
        self
    }

    /// Enable or disable the category normalizer stage.
    pub fn enforce_grade_enumerations(mut self, enforce: bool) -> Self {
        self.enforce_grade_enumerations = Some(enforce);
        self
    }

    /// Set the analysed carat range.
    pub fn carat_range(mut self, min: f64, max: f64) -> Self {
        self.carat_range = Some((min, max));
        self
    }

    /// Set the carat bin width used by the underpriced detector.
    pub fn detector_bin_width(mut self, width: f64) -> Self {
        self.detector_bin_width = Some(width);
        self
    }

    /// Set the carat bin width used by the volatility ranker.
    pub fn volatility_bin_width(mut self, width: f64) -> Self {
        self.volatility_bin_width = Some(width);
        self
    }

    /// Set the minimum peer group population.
    pub fn min_group_size(mut self, size: usize) -> Self {
        self.min_group_size = Some(size);
        self
    }

    /// Set how many attribute values per carat bin count toward a ranking.
    pub fn volatility_top_k(mut self, k: usize) -> Self {
        self.volatility_top_k = Some(k);
        self
    }

    /// Set how many attribute values a ranking returns.
    pub fn ranking_limit(mut self, limit: usize) -> Self {
        self.ranking_limit = Some(limit);
        self
    }

    /// Set how many underpriced candidates the pipeline keeps.
    pub fn candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = Some(limit);
        self
    }

    /// Set the attributes that define a peer group.
    pub fn group_by(mut self, attributes: Vec<CategoricalAttribute>) -> Self {
        self.group_by = Some(attributes);
        self
    }

    /// Set the markup used for the optimistic resale estimate.
    pub fn resale_markup(mut self, markup: f64) -> Self {
        self.resale_markup = Some(markup);
        self
    }

    pub fn target_profile(mut self, profile: TargetProfile) -> Self {
        self.target_profile = Some(profile);
        self
    }

    pub fn selection(mut self, selection: AttributeSelection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Set the output directory for reports and exports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file stem.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let base = self.base.unwrap_or_default();
        let (min_carat, max_carat) = self
            .carat_range
            .unwrap_or((base.min_carat, base.max_carat));

        let config = PipelineConfig {
            max_dimension_mm: self.max_dimension_mm.unwrap_or(base.max_dimension_mm),
            small_stone_carat: base.small_stone_carat,
            max_small_stone_height_mm: base.max_small_stone_height_mm,
            max_depth_deviation: self.max_depth_deviation.unwrap_or(base.max_depth_deviation),
            enforce_grade_enumerations: self
                .enforce_grade_enumerations
                .unwrap_or(base.enforce_grade_enumerations),
            min_carat,
            max_carat,
            detector_bin_width: self.detector_bin_width.unwrap_or(base.detector_bin_width),
            volatility_bin_width: self
                .volatility_bin_width
                .unwrap_or(base.volatility_bin_width),
            min_group_size: self.min_group_size.unwrap_or(base.min_group_size),
            volatility_top_k: self.volatility_top_k.unwrap_or(base.volatility_top_k),
            ranking_limit: self.ranking_limit.unwrap_or(base.ranking_limit),
            candidate_limit: self.candidate_limit.unwrap_or(base.candidate_limit),
            group_by: self.group_by.unwrap_or(base.group_by),
            resale_markup: self.resale_markup.unwrap_or(base.resale_markup),
            target_profile: self.target_profile.unwrap_or(base.target_profile),
            selection: self.selection.unwrap_or(base.selection),
            output_dir: self.output_dir.unwrap_or(base.output_dir),
            output_name: self.output_name.or(base.output_name),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::Color;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_dimension_mm, 15.0);
        assert_eq!(config.detector_bin_width, 0.1);
        assert_eq!(config.volatility_bin_width, 0.01);
        assert_eq!(config.min_group_size, 10);
        assert_eq!(config.volatility_top_k, 3);
        assert_eq!(config.candidate_limit, 50);
        assert!(config.enforce_grade_enumerations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .detector_bin_width(0.01)
            .min_group_size(5)
            .candidate_limit(10)
            .enforce_grade_enumerations(false)
            .group_by(vec![CategoricalAttribute::Cut])
            .build()
            .unwrap();

        assert_eq!(config.detector_bin_width, 0.01);
        assert_eq!(config.min_group_size, 5);
        assert_eq!(config.candidate_limit, 10);
        assert!(!config.enforce_grade_enumerations);
        assert_eq!(config.group_by, vec![CategoricalAttribute::Cut]);
    }

    #[test]
    fn test_builder_keeps_base_values() {
        let base = PipelineConfig {
            resale_markup: 0.25,
            ..Default::default()
        };
        let config = PipelineConfig::builder()
            .base(base)
            .ranking_limit(5)
            .build()
            .unwrap();
        assert_eq!(config.resale_markup, 0.25);
        assert_eq!(config.ranking_limit, 5);
    }

    #[test]
    fn test_validation_rejects_zero_width() {
        let result = PipelineConfig::builder().detector_bin_width(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidBinWidth { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_width_wider_than_range() {
        let result = PipelineConfig::builder().volatility_bin_width(2.0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_group_size() {
        let result = PipelineConfig::builder().min_group_size(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroCount(field) if field == "min_group_size"
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_range() {
        let result = PipelineConfig::builder().carat_range(1.0, 0.1).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidCaratRange { .. }
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "detector_bin_width": 0.01,
            "group_by": ["cut", "color"],
            "target_profile": { "colors": ["D"] },
            "selection": { "colors": ["D", "E"] }
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.detector_bin_width, 0.01);
        assert_eq!(
            config.group_by,
            vec![CategoricalAttribute::Cut, CategoricalAttribute::Color]
        );
        assert_eq!(config.target_profile.colors, vec![Color::D]);
        assert!(!config.target_profile.cuts.is_empty());
        assert_eq!(config.selection.colors, Some(vec![Color::D, Color::E]));
        assert_eq!(config.min_group_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
