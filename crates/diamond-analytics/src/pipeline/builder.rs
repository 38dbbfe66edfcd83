//! The pipeline orchestrator and its builder.

use crate::analysis::{UnderpricedDetector, VolatilityRanker, summarize};
use crate::cleaner::DataCleaner;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{EmptyResultWarning, Result};
use crate::grades::CategoricalAttribute;
use crate::ingest::RecordValidator;
use crate::pipeline::cache::CleaningCache;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{CleanedDataset, PipelineReport, VolatilityRanking};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Attributes ranked by every run, in report order.
pub const RANKED_ATTRIBUTES: [CategoricalAttribute; 3] = [
    CategoricalAttribute::Color,
    CategoricalAttribute::Clarity,
    CategoricalAttribute::Cut,
];

/// The analytics pipeline.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use diamond_analytics::{CleaningCache, Pipeline, PipelineConfig};
/// use std::sync::Arc;
///
/// let cache = Arc::new(CleaningCache::new());
/// let report = Pipeline::builder()
///     .config(PipelineConfig::builder().candidate_limit(20).build()?)
///     .cache(cache.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(&std::fs::read("diamonds.csv")?)?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cache: Option<Arc<CleaningCache>>,
    validator: RecordValidator,
    cleaner: DataCleaner,
    detector: UnderpricedDetector,
    ranker: VolatilityRanker,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over raw input bytes.
    ///
    /// # Errors
    ///
    /// Fails only when the input cannot be decoded or lacks required
    /// columns. Empty outcomes are reported as warnings in the report.
    pub fn run(&self, raw: &[u8]) -> Result<PipelineReport> {
        let start_time = Instant::now();
        info!("Starting diamond analytics pipeline...");

        let result = self.clean(raw).map(|cleaned| {
            let mut report = self.analyze(&cleaned);
            report.duration_ms = start_time.elapsed().as_millis() as u64;
            report
        });

        match result {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Pipeline completed: {} candidates",
                    report.candidates.len()
                )));
                info!("Pipeline completed in {}ms", report.duration_ms);
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Validate and clean raw bytes, consulting the cache if one is set.
    pub fn clean(&self, raw: &[u8]) -> Result<Arc<CleanedDataset>> {
        match &self.cache {
            Some(cache) => {
                let key = CleaningCache::key_for(raw, &self.config);
                if let Some(hit) = cache.get(key) {
                    self.report_progress(ProgressUpdate::new(
                        PipelineStage::Normalizing,
                        1.0,
                        "Using cached clean dataset",
                    ));
                    return Ok(hit);
                }
                cache.get_or_try_insert_with(key, || self.clean_uncached(raw))
            }
            None => self.clean_uncached(raw).map(Arc::new),
        }
    }

    fn clean_uncached(&self, raw: &[u8]) -> Result<CleanedDataset> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Validating,
            0.0,
            "Validating input...",
        ));
        let (dataset, validation) = self.validator.validate(raw)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Filtering,
            0.0,
            format!("Filtering {} rows...", dataset.len()),
        ));
        let (dataset, filter, normalization) = self.cleaner.clean(dataset);

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Normalizing,
            1.0,
            format!("{} clean rows", dataset.len()),
        ));

        Ok(CleanedDataset {
            dataset,
            validation,
            filter,
            normalization,
        })
    }

    /// Run detection, ranking and summary over an already cleaned dataset.
    pub fn analyze(&self, cleaned: &CleanedDataset) -> PipelineReport {
        let mut warnings = Vec::new();
        let clean = &cleaned.dataset;
        if clean.is_empty() {
            warn!("No rows remained after cleaning");
            warnings.push(EmptyResultWarning::NoRowsAfterCleaning);
        }

        let selected = clean.select(&self.config.selection);
        info!("{} of {} clean rows selected", selected.len(), clean.len());

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Detecting,
            0.0,
            "Detecting underpriced stones...",
        ));
        let detection = self
            .detector
            .detect_with_groups(&selected, &self.config.group_by);
        if !clean.is_empty() {
            if selected.is_empty() {
                warnings.push(EmptyResultWarning::NoRowsSelected);
            } else if detection.qualifying_groups == 0 {
                warnings.push(EmptyResultWarning::NoQualifyingPeerGroups {
                    min_group_size: self.config.min_group_size,
                });
            } else if detection.candidates.is_empty() {
                warnings.push(EmptyResultWarning::NoStonesBelowMedian {
                    qualifying_groups: detection.qualifying_groups,
                });
            }
        }
        let mut candidates = detection.candidates;
        candidates.truncate(self.config.candidate_limit);

        let mut rankings = Vec::with_capacity(RANKED_ATTRIBUTES.len());
        for (i, attribute) in RANKED_ATTRIBUTES.into_iter().enumerate() {
            self.report_progress(ProgressUpdate::with_sub_stage(
                PipelineStage::Ranking,
                format!("Attribute: {}", attribute),
                i as f32 / RANKED_ATTRIBUTES.len() as f32,
                format!("Ranking {} by volatility...", attribute),
            ));
            let entries = self.ranker.rank(clean, attribute);
            if entries.is_empty() && !clean.is_empty() {
                warnings.push(EmptyResultWarning::NoVolatilityRanking {
                    attribute: attribute.to_string(),
                });
            }
            rankings.push(VolatilityRanking { attribute, entries });
        }

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Summarizing,
            0.0,
            "Summarizing investment...",
        ));
        let summary = summarize(&candidates, self.config.resale_markup);

        for warning in &warnings {
            warn!("{}", warning.message());
        }

        PipelineReport {
            duration_ms: 0,
            rows_read: cleaned.validation.rows_read,
            rows_clean: clean.len(),
            rows_selected: selected.len(),
            validation: cleaned.validation.clone(),
            filter: cleaned.filter.clone(),
            normalization: cleaned.normalization.clone(),
            cleaning_actions: cleaned.actions(),
            candidates,
            rankings,
            summary,
            warnings,
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cache: Option<Arc<CleaningCache>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Share a cleaning cache. Pipelines holding the same cache reuse each
    /// other's cleaned datasets.
    pub fn cache(mut self, cache: Arc<CleaningCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            validator: RecordValidator::new(),
            cleaner: DataCleaner::from_config(&config),
            detector: UnderpricedDetector::from_config(&config),
            ranker: VolatilityRanker::from_config(&config),
            config,
            progress_reporter: self.progress_reporter,
            cache: self.cache,
        })
    }
}
