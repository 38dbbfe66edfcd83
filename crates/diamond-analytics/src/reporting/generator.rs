use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{Result, ResultExt};
use crate::types::{PipelineReport, UnderpricedCandidate};
use chrono::Local;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// A pipeline report stamped with its origin, for stdout or file output.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path of the analysed input
    pub input_file: String,
    #[serde(flatten)]
    pub pipeline: PipelineReport,
}

/// Writes reports and CSV exports into an output directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or("diamonds")
    }

    fn path_for(&self, suffix: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(self.output_dir.join(format!("{}_{}", self.stem(), suffix)))
    }

    pub fn build_report(input_file: &str, pipeline: PipelineReport) -> AnalysisReport {
        AnalysisReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            pipeline,
        }
    }

    /// Write `<name>_report.json`.
    pub fn write_report_to_file(&self, report: &AnalysisReport) -> Result<PathBuf> {
        let report_path = self.path_for("report.json")?;
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    /// Write `<name>_candidates.csv`.
    pub fn write_candidates(&self, candidates: &[UnderpricedCandidate]) -> Result<PathBuf> {
        let mut df = candidates_to_dataframe(candidates)?;
        let path = self.path_for("candidates.csv")?;
        write_csv(&path, &mut df)?;

        info!("Candidates saved: {}", path.display());
        Ok(path)
    }

    /// Write `<name>_clean.csv`.
    pub fn write_clean_dataset(&self, dataset: &Dataset) -> Result<PathBuf> {
        let mut df = dataset.to_dataframe()?;
        let path = self.path_for("clean.csv")?;
        write_csv(&path, &mut df)?;

        info!("Clean dataset saved: {}", path.display());
        Ok(path)
    }
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Writing {}", path.display()))
}

/// Candidates as a table, one row per stone, in ranking order.
pub fn candidates_to_dataframe(candidates: &[UnderpricedCandidate]) -> PolarsResult<DataFrame> {
    let ids: Vec<u64> = candidates.iter().map(|c| c.record.id).collect();
    let cuts: Vec<String> = candidates.iter().map(|c| c.record.cut.to_string()).collect();
    let colors: Vec<String> = candidates.iter().map(|c| c.record.color.to_string()).collect();
    let clarities: Vec<String> = candidates
        .iter()
        .map(|c| c.record.clarity.to_string())
        .collect();
    let carats: Vec<f64> = candidates.iter().map(|c| c.record.carat).collect();
    let prices: Vec<f64> = candidates.iter().map(|c| c.record.price).collect();
    let bins: Vec<String> = candidates.iter().map(|c| c.carat_bin.to_string()).collect();
    let keys: Vec<String> = candidates.iter().map(|c| c.group_key.clone()).collect();
    let medians: Vec<f64> = candidates.iter().map(|c| c.peer_median_price).collect();
    let amounts: Vec<f64> = candidates.iter().map(|c| c.deviation_amount).collect();
    let percents: Vec<f64> = candidates.iter().map(|c| c.deviation_percent).collect();
    let sizes: Vec<u64> = candidates.iter().map(|c| c.peer_group_size as u64).collect();
    let in_profile: Vec<bool> = candidates.iter().map(|c| c.in_target_profile).collect();

    df!(
        "id" => ids,
        "cut" => cuts,
        "color" => colors,
        "clarity" => clarities,
        "carat" => carats,
        "price" => prices,
        "carat_bin" => bins,
        "group_key" => keys,
        "peer_median_price" => medians,
        "deviation_amount" => amounts,
        "deviation_percent" => percents,
        "peer_group_size" => sizes,
        "in_target_profile" => in_profile
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::UnderpricedDetector;
    use crate::dataset::test_support::stone;
    use crate::grades::CategoricalAttribute;

    fn candidates() -> Vec<UnderpricedCandidate> {
        let dataset: Dataset = (0..12u64)
            .map(|i| stone(i + 1, 1000.0 + 100.0 * i as f64))
            .collect();
        UnderpricedDetector::default().detect(&dataset, &[CategoricalAttribute::Cut])
    }

    #[test]
    fn test_candidates_to_dataframe() {
        let df = candidates_to_dataframe(&candidates()).unwrap();
        assert_eq!(df.height(), 6);
        assert_eq!(df.width(), 13);
        let bins = df.column("carat_bin").unwrap().as_materialized_series().str().unwrap().get(0);
        assert_eq!(bins, Some("(0.4, 0.5]"));
    }

    #[test]
    fn test_write_outputs() {
        let dir = std::env::temp_dir().join(format!("diamond-analytics-{}", std::process::id()));
        let generator = ReportGenerator::new(dir.clone(), Some("unit".to_string()));

        let path = generator.write_candidates(&candidates()).unwrap();
        assert!(path.ends_with("unit_candidates.csv"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("id,cut,color,clarity"));
        assert_eq!(content.lines().count(), 7);

        let clean = generator
            .write_clean_dataset(&Dataset::new(vec![stone(1, 500.0)]))
            .unwrap();
        assert!(fs::read_to_string(&clean).unwrap().contains("depth_calc"));

        fs::remove_dir_all(dir).ok();
    }
}
