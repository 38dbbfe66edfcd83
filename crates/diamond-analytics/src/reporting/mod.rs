//! Report generation.
//!
//! [`ReportGenerator`] writes into the configured output directory:
//! - `<name>_report.json`: the [`AnalysisReport`]
//! - `<name>_candidates.csv`: underpriced stones
//! - `<name>_clean.csv`: the cleaned dataset, on request
//!
//! # Example
//!
//! ```rust,ignore
//! use diamond_analytics::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("data/diamonds.csv", pipeline_report);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::from_config(&config);
//! generator.write_report_to_file(&report)?;
//! generator.write_candidates(&report.pipeline.candidates)?;
//! ```

mod generator;

pub use generator::{AnalysisReport, ReportGenerator, candidates_to_dataframe};
