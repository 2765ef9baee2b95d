use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qc_core::constants::{DEFAULT_EPSILON, DEFAULT_SUBJECT_TYPE, DEFAULT_TOTAL_SUBJECTS};
use qc_core::html::{render_html_report, write_html_report};
use qc_core::{BatchOutcome, BatchRunner, FhirClient, ReportType, RunConfig};

/// Log directives used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_DIRECTIVES: &str = "qc_run=info,qc_core=info";

#[derive(Parser)]
#[command(name = "qc-run")]
#[command(about = "Evaluate CQL measures and output results with differential privacy")]
struct Cli {
    /// Directory containing .cql files
    #[arg(short, long)]
    directory: PathBuf,

    /// Subject type (e.g. Patient, Specimen)
    #[arg(short = 't', long, default_value = DEFAULT_SUBJECT_TYPE)]
    subject_type: String,

    /// Report type: population or subject-list
    #[arg(short, long, default_value_t = ReportType::Population)]
    report_type: ReportType,

    /// Differential privacy epsilon per file
    #[arg(short, long, default_value_t = DEFAULT_EPSILON, allow_negative_numbers = true)]
    epsilon: f64,

    /// Privacy budget across all files; files beyond it are skipped
    #[arg(long, env = "QC_TOTAL_EPSILON")]
    total_epsilon: Option<f64>,

    /// Seed for reproducible noise
    #[arg(long, env = "QC_SEED")]
    seed: Option<u64>,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, env = "QC_HTTP_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Also write an HTML report to this path
    #[arg(long)]
    html_report: Option<PathBuf>,

    /// Denominator for the percentages in the HTML report
    #[arg(long, default_value_t = DEFAULT_TOTAL_SUBJECTS)]
    total_subjects: u64,

    /// FHIR server base URL
    base: String,
}

/// Entry point for the quality check runner
///
/// Evaluates every `.cql` file in `--directory` against the FHIR server at `BASE` and prints the
/// results, keyed by file name, as JSON on stdout. Progress and per-file errors go to stderr.
///
/// # Environment Variables
/// - `RUST_LOG`: log filter; replaces the default of info for this tool
/// - `QC_TOTAL_EPSILON`, `QC_SEED`, `QC_HTTP_TIMEOUT_SECS`: fallbacks for the matching flags
///
/// # Returns
/// * `Ok(())` - If the run completed, even when individual files failed
/// * `Err(anyhow::Error)` - If the input directory, epsilon or base URL is invalid
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = RunConfig::new(
        cli.directory,
        &cli.base,
        cli.subject_type,
        cli.report_type,
        cli.epsilon,
        cli.total_epsilon,
    )?
    .with_seed(cli.seed)
    .with_timeout(cli.timeout_secs.map(Duration::from_secs));

    let client = FhirClient::from_config(&config)?;
    let mut runner = BatchRunner::new(client, config)?;
    let outcome = runner.run()?;

    if !outcome.failures.is_empty() {
        tracing::warn!(
            "{} file(s) produced no result: {}",
            outcome.failures.len(),
            outcome
                .failures
                .iter()
                .map(|f| f.file.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    tracing::info!("{}", epsilon_summary(&outcome));

    if let Some(path) = cli.html_report {
        let html = render_html_report(&outcome.results, cli.total_subjects, outcome.epsilon_spent);
        write_html_report(&path, &html)?;
        tracing::info!("Report saved to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&outcome.results)?);

    Ok(())
}

/// Builds the log filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_DIRECTIVES`].
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

fn epsilon_summary(outcome: &BatchOutcome) -> String {
    match outcome.epsilon_remaining {
        Some(remaining) => format!(
            "Total epsilon used: {} ({} remaining)",
            outcome.epsilon_spent, remaining
        ),
        None => format!("Total epsilon used: {}", outcome.epsilon_spent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_core::ResultsMap;

    #[test]
    fn rust_log_replaces_the_default_directives() {
        assert_eq!(log_filter(Some("qc_core=debug")).to_string(), "qc_core=debug");
        assert_eq!(log_filter(Some("qc_core=error")).to_string(), "qc_core=error");
    }

    #[test]
    fn default_directives_apply_without_rust_log() {
        for rust_log in [None, Some(""), Some("  ")] {
            let filter = log_filter(rust_log).to_string();
            assert!(filter.contains("qc_core=info"), "{filter}");
            assert!(filter.contains("qc_run=info"), "{filter}");
        }
    }

    #[test]
    fn epsilon_summary_reports_spend_and_remaining_budget() {
        let mut outcome = BatchOutcome {
            results: ResultsMap::new(),
            failures: Vec::new(),
            epsilon_spent: 2.0,
            epsilon_remaining: None,
        };
        assert_eq!(epsilon_summary(&outcome), "Total epsilon used: 2");

        outcome.epsilon_remaining = Some(0.5);
        assert_eq!(
            epsilon_summary(&outcome),
            "Total epsilon used: 2 (0.5 remaining)"
        );
    }
}
