//! CLI entry point for the diamond analytics pipeline.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use diamond_analytics::{
    CategoricalAttribute, Clarity, CleaningCache, Color, Cut, Pipeline, PipelineConfig,
    PipelineError, PipelineReport, ReportGenerator,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Diamond price list cleaning and opportunity ranking",
    long_about = "Cleans a diamond price list, finds stones priced below their peer group \
                  and ranks grades by price volatility.\n\n\
                  EXAMPLES:\n  \
                  # Basic usage\n  \
                  diamond-analytics -i diamonds.csv\n\n  \
                  # Group by color and clarity only, finer bins\n  \
                  diamond-analytics -i diamonds.csv --group-by color,clarity --detector-bin-width 0.05\n\n  \
                  # Restrict to colorless stones and save everything\n  \
                  diamond-analytics -i diamonds.csv --colors D,E,F -r --export-clean\n\n  \
                  # Machine-readable output\n  \
                  diamond-analytics -i diamonds.csv --json | jq .summary"
)]
struct Args {
    /// Path to the CSV file to analyse
    #[arg(short, long)]
    input: String,

    /// Output directory for reports and exports
    ///
    /// If not specified, uses the config file's value or "output"
    #[arg(short, long)]
    output: Option<String>,

    /// Custom output file stem (without extension)
    ///
    /// If not specified, uses "diamonds"
    #[arg(long)]
    output_name: Option<String>,

    /// JSON file with a pipeline configuration
    ///
    /// Flags given on the command line override values from the file
    #[arg(long)]
    config: Option<String>,

    /// Attributes that define a peer group, comma separated
    #[arg(long, value_delimiter = ',')]
    group_by: Option<Vec<CategoricalAttribute>>,

    /// Number of underpriced candidates to keep
    #[arg(long)]
    top: Option<usize>,

    /// Carat bin width for the underpriced detector
    #[arg(long)]
    detector_bin_width: Option<f64>,

    /// Carat bin width for the volatility ranker
    #[arg(long)]
    volatility_bin_width: Option<f64>,

    /// Smallest peer group that is reported
    #[arg(long)]
    min_group_size: Option<usize>,

    /// Attribute values kept per carat bin when ranking volatility
    #[arg(long)]
    top_k: Option<usize>,

    /// Keep rows whose grades are outside the known scales
    #[arg(long, default_value = "false")]
    no_grade_filter: bool,

    /// Only analyse these colors (e.g. D,E,F)
    #[arg(long, value_delimiter = ',')]
    colors: Option<Vec<Color>>,

    /// Only analyse these clarities (e.g. IF,VVS1)
    #[arg(long, value_delimiter = ',')]
    clarities: Option<Vec<Clarity>>,

    /// Only analyse these cuts (e.g. Ideal,Premium)
    #[arg(long, value_delimiter = ',')]
    cuts: Option<Vec<Cut>>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write the JSON report and the candidates CSV to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Write the cleaned dataset as CSV to the output directory
    #[arg(long)]
    export_clean: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;
    debug!("Configuration: {:?}", config);

    info!("Loading dataset from: {}", args.input);
    let raw = std::fs::read(&args.input)
        .with_context(|| format!("Could not read {}", args.input))?;

    let pipeline = build_pipeline(&args, config)?;

    let report = match pipeline.run(&raw) {
        Ok(report) => report,
        Err(e) if e.is_input_error() => {
            report_input_error(&e, args.json)?;
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let generator = ReportGenerator::from_config(pipeline.config());

    if args.export_clean {
        // Served from the cache filled by `run`.
        let cleaned = pipeline.clean(&raw)?;
        let path = generator.write_clean_dataset(&cleaned.dataset)?;
        info!("Clean dataset written to: {}", path.display());
    }

    if args.emit_report {
        let path = generator.write_candidates(&report.candidates)?;
        info!("Candidates written to: {}", path.display());
    }

    if args.json || args.emit_report {
        let analysis = ReportGenerator::build_report(&args.input, report.clone());
        if args.emit_report {
            let path = generator.write_report_to_file(&analysis)?;
            info!("Report written to: {}", path.display());
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(ExitCode::SUCCESS);
        }
    }

    if !args.quiet {
        print_human_readable_summary(&report, &args);
    }

    Ok(ExitCode::SUCCESS)
}

/// Layer command line flags over the optional JSON configuration.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config file {}", path))?;
            serde_json::from_str::<PipelineConfig>(&text)
                .with_context(|| format!("Invalid config file {}", path))?
        }
        None => PipelineConfig::default(),
    };

    let mut selection = base.selection.clone();
    if let Some(colors) = &args.colors {
        selection.colors = Some(colors.clone());
    }
    if let Some(clarities) = &args.clarities {
        selection.clarities = Some(clarities.clone());
    }
    if let Some(cuts) = &args.cuts {
        selection.cuts = Some(cuts.clone());
    }

    let mut builder = PipelineConfig::builder().base(base).selection(selection);

    if let Some(ref dir) = args.output {
        builder = builder.output_dir(dir);
    }
    if let Some(ref name) = args.output_name {
        builder = builder.output_name(name);
    }
    if let Some(ref attributes) = args.group_by {
        builder = builder.group_by(attributes.clone());
    }
    if let Some(top) = args.top {
        builder = builder.candidate_limit(top);
    }
    if let Some(width) = args.detector_bin_width {
        builder = builder.detector_bin_width(width);
    }
    if let Some(width) = args.volatility_bin_width {
        builder = builder.volatility_bin_width(width);
    }
    if let Some(size) = args.min_group_size {
        builder = builder.min_group_size(size);
    }
    if let Some(k) = args.top_k {
        builder = builder.volatility_top_k(k);
    }
    if args.no_grade_filter {
        builder = builder.enforce_grade_enumerations(false);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder()
        .config(config)
        .cache(Arc::new(CleaningCache::new()));

    if !args.json && !args.quiet {
        builder = builder.on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print an unreadable-input error in the requested format.
fn report_input_error(error: &PipelineError, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(error)?);
    } else {
        eprintln!("Error: {}", error);
    }
    Ok(())
}

/// Print a human-readable summary of the analysis.
///
/// This is the default output when neither `--json` nor `--quiet` are specified.
fn print_human_readable_summary(report: &PipelineReport, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input: {}", args.input);
    println!(
        "Rows:  {} read, {} clean, {} selected",
        report.rows_read, report.rows_clean, report.rows_selected
    );
    println!("Duration: {}ms", report.duration_ms);
    println!();

    if !report.cleaning_actions.is_empty() {
        println!("Cleaning:");
        for action in &report.cleaning_actions {
            println!(
                "  - [{}] {}",
                action.action_type.display_name(),
                action.description
            );
        }
        println!();
    }

    println!("Underpriced Stones:");
    if report.has_candidates() {
        println!(
            "  {:>8} {:>6} {:<10} {:<6} {:<8} {:>10} {:>10} {:>8}",
            "Id", "Carat", "Cut", "Color", "Clarity", "Price", "Median", "Below"
        );
        println!("  {}", "-".repeat(74));
        for candidate in report.candidates.iter().take(10) {
            let record = &candidate.record;
            println!(
                "  {:>8} {:>6.2} {:<10} {:<6} {:<8} {:>10.2} {:>10.2} {:>7.1}%",
                record.id,
                record.carat,
                truncate_str(record.cut.label(), 10),
                record.color.label(),
                record.clarity.label(),
                record.price,
                candidate.peer_median_price,
                candidate.deviation_percent
            );
        }
        if report.candidates.len() > 10 {
            println!("  ... and {} more candidates", report.candidates.len() - 10);
        }
    } else {
        println!("  none");
    }
    println!();

    println!("Most Volatile Grades:");
    for ranking in &report.rankings {
        let values: Vec<String> = ranking
            .entries
            .iter()
            .map(|entry| {
                let marker = if entry.in_target_profile { "*" } else { "" };
                format!("{}{} ({})", entry.value, marker, entry.frequency)
            })
            .collect();
        let listed = if values.is_empty() {
            "none".to_string()
        } else {
            values.join(", ")
        };
        println!("  {:<8} {}", ranking.attribute, listed);
    }
    println!("  (* = in target profile)");
    println!();

    let summary = &report.summary;
    if summary.candidates > 0 {
        println!("Investment Summary:");
        println!("  Stones:            {}", summary.candidates);
        println!("  Total investment:  {:.2}", summary.total_investment);
        println!("  Profit at median:  {:.2}", summary.profit_at_median);
        println!(
            "  Profit at +{:.0}%:   {:.2}",
            summary.resale_markup * 100.0,
            summary.profit_at_markup
        );
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  ! {}", warning.message());
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the report and candidates CSV");
    println!("{}", "=".repeat(80));
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
