use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

use match_stats::app::aggregate_use_case::run_aggregation;
use match_stats::{logging, metrics};

#[derive(Parser)]
#[command(name = "aggregate")]
#[command(about = "Roll the canonical match store up into dashboard datasets")]
#[command(version)]
struct Cli {
    /// Canonical NDJSON store
    #[arg(long, default_value = "data/matches.ndjson")]
    input: PathBuf,

    /// Directory receiving the JSON datasets
    #[arg(long, default_value = "out")]
    output_dir: PathBuf,

    /// Fixed metadata timestamp (RFC 3339) for reproducible output
    #[arg(long)]
    generated_at: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging();
    metrics::init_metrics();

    let generated_at = cli.generated_at.unwrap_or_else(Utc::now);
    let report = run_aggregation(&cli.input, &cli.output_dir, generated_at)
        .map_err(|e| {
            let e = anyhow::Error::new(e);
            tracing::error!("aggregate failed: {:#}", e);
            e.context("aggregate failed")
        })?;
    println!(
        "✅ aggregate: {} matches ({} dropped lines), {} champions, {} queues, {} patches, {} days -> {}",
        report.matches,
        report.dropped_lines,
        report.champions,
        report.queues,
        report.patches,
        report.days,
        report.output_dir.display()
    );
    Ok(())
}
