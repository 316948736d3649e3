use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use match_stats::app::ingest_use_case::{load_identifiers, IngestOptions, IngestUseCase};
use match_stats::app::normalize_use_case::NormalizeUseCase;
use match_stats::app::ports::PayloadStorePort;
use match_stats::app::QueueFilter;
use match_stats::config::{api_key_from_env, Config};
use match_stats::constants::{Region, CANONICAL_FILE};
use match_stats::infra::http_client::ReqwestHttp;
use match_stats::infra::payload_store::FsPayloadStore;
use match_stats::pipeline::ingestion::{FetchClient, PacingGate};
use match_stats::pipeline::processing::normalize::MatchNormalizer;
use match_stats::{logging, metrics};

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Fetch match payloads at a paced rate and append canonical records")]
#[command(version)]
struct Cli {
    /// Newline-delimited match id list
    #[arg(long, env = "MATCH_IDS_FILE")]
    ids: Option<PathBuf>,

    /// Regional routing value (americas, europe, asia, sea)
    #[arg(long, env = "RIOT_REGION", default_value = "europe")]
    region: Region,

    /// Concurrent fetches in flight
    #[arg(long, env = "INGEST_CONCURRENCY", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: u16,

    /// Raw payload directory; the canonical store lives here too
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Player id list used to discover recent match ids
    #[arg(long)]
    seed_puuids: Option<PathBuf>,

    /// Match ids requested per seed player
    #[arg(long, default_value_t = 20)]
    per_player: u32,

    /// Keep only these queue ids (repeatable)
    #[arg(long = "queue")]
    queues: Vec<i64>,

    /// Also fetch match timelines
    #[arg(long)]
    timelines: bool,

    /// TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging();
    metrics::init_metrics();

    // The returned error prints with its full cause chain and exits non-zero
    run(cli).await.map_err(|e| {
        tracing::error!("ingest failed: {:#}", e);
        e.context("ingest failed")
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Credential and inputs are checked before anything is scheduled
    let api_key = api_key_from_env()?;
    let config = Config::load(cli.config.as_deref())?;
    let mut ids = match &cli.ids {
        Some(path) => load_identifiers(path)?,
        None => Vec::new(),
    };
    let seeds = match &cli.seed_puuids {
        Some(path) => load_identifiers(path)?,
        None => Vec::new(),
    };

    let base_url = config
        .fetch
        .api_base_url
        .clone()
        .unwrap_or_else(|| cli.region.base_url());
    let http = ReqwestHttp::new(config.fetch.timeout())
        .map_err(|e| anyhow!("building HTTP client: {:?}", e))?;
    let client = Arc::new(FetchClient::new(
        Arc::new(http),
        Arc::new(PacingGate::new(config.fetch.min_interval())),
        config.fetch.retry_policy(),
        api_key,
        base_url.clone(),
    ));
    let store: Arc<dyn PayloadStorePort> = Arc::new(FsPayloadStore::new(&cli.data_dir));
    let queue_filter = QueueFilter::new(cli.queues.iter().copied());
    let ingest = IngestUseCase::new(
        client,
        store.clone(),
        usize::from(cli.concurrency),
        IngestOptions {
            with_timelines: cli.timelines,
            queue_filter: queue_filter.clone(),
            per_player: cli.per_player,
        },
    );

    info!(
        region = %cli.region,
        base_url = %base_url,
        ids = ids.len(),
        seeds = seeds.len(),
        concurrency = cli.concurrency,
        "starting ingest"
    );

    let fetch = async move {
        ids.extend(ingest.discover(seeds).await?);
        ingest.fetch_all(ids).await
    };
    let pool_report = tokio::select! {
        report = fetch => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; persisted payloads are kept for the next run");
            return Err(anyhow!("interrupted"));
        }
    };

    let canonical = canonical_path(&cli.data_dir);
    let normalize = NormalizeUseCase::new(Box::new(MatchNormalizer), store, queue_filter);
    let norm_report = normalize
        .run(&canonical)
        .await
        .with_context(|| format!("normalizing into {}", canonical.display()))?;

    println!(
        "✅ ingest: {} fetched, {} cached, {} duplicate, {} failed; {} records appended ({} present, {} filtered, {} malformed, {} rejected) -> {}",
        pool_report.fetched,
        pool_report.cached,
        pool_report.duplicates,
        pool_report.failed.len(),
        norm_report.appended,
        norm_report.already_present,
        norm_report.filtered,
        norm_report.malformed,
        norm_report.rejected,
        canonical.display()
    );
    Ok(())
}

fn canonical_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CANONICAL_FILE)
}
