use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{
    CHAMPIONS_FILE, DAYS_FILE, MATCH_INDEX_FILE, METADATA_FILE, PATCHES_FILE, QUEUES_FILE,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::aggregate::StreamingAggregator;
use crate::pipeline::storage::json_output::{write_json_pretty, JsonArrayWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub matches: u64,
    pub dropped_lines: u64,
    pub champions: usize,
    pub queues: usize,
    pub patches: usize,
    pub days: usize,
    pub output_dir: PathBuf,
}

/// Stream the canonical log once and write the dashboard datasets.
///
/// A missing input is a configuration error; an empty one yields empty datasets.
pub fn run_aggregation(
    input: &Path,
    output_dir: &Path,
    generated_at: DateTime<Utc>,
) -> Result<AggregateReport> {
    let file = File::open(input).map_err(|e| {
        PipelineError::Configuration(format!("cannot open canonical store {}: {}", input.display(), e))
    })?;
    std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::filesystem(output_dir, e))?;

    let index_path = output_dir.join(MATCH_INDEX_FILE);
    let mut index = JsonArrayWriter::create(&index_path)
        .map_err(|e| PipelineError::filesystem(&index_path, e))?;
    let mut aggregator = StreamingAggregator::new();
    aggregator
        .fold_lines(BufReader::new(file), |entry| index.push(&entry))
        .map_err(|e| PipelineError::filesystem(input, e))?;
    index
        .finish()
        .map_err(|e| PipelineError::filesystem(&index_path, e))?;

    let datasets = aggregator.finish(generated_at);
    write_dataset(output_dir, METADATA_FILE, &datasets.metadata)?;
    write_dataset(output_dir, CHAMPIONS_FILE, &datasets.champions)?;
    write_dataset(output_dir, QUEUES_FILE, &datasets.queues)?;
    write_dataset(output_dir, PATCHES_FILE, &datasets.patches)?;
    write_dataset(output_dir, DAYS_FILE, &datasets.days)?;

    let report = AggregateReport {
        matches: datasets.metadata.match_count,
        dropped_lines: datasets.metadata.dropped_lines,
        champions: datasets.champions.len(),
        queues: datasets.queues.len(),
        patches: datasets.patches.len(),
        days: datasets.days.len(),
        output_dir: output_dir.to_path_buf(),
    };
    info!(
        matches = report.matches,
        dropped = report.dropped_lines,
        champions = report.champions,
        output = %output_dir.display(),
        "datasets written"
    );
    Ok(report)
}

fn write_dataset<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    write_json_pretty(&path, value).map_err(|e| PipelineError::filesystem(&path, e))
}
