use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::app::ports::{PayloadKind, PayloadStorePort};
use crate::app::QueueFilter;
use crate::error::{FetchError, PipelineError, Result};
use crate::infra::payload_store::is_valid_identifier;
use crate::pipeline::ingestion::{FetchClient, ItemError, ItemOutcome, PoolReport, PoolWorker, WorkerPool};
use crate::pipeline::processing::normalize::coerce_i64;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub with_timelines: bool,
    pub queue_filter: QueueFilter,
    /// Match ids requested per seed player
    pub per_player: u32,
}

/// Fetches and persists raw match payloads (and optionally timelines).
pub struct IngestUseCase {
    client: Arc<FetchClient>,
    store: Arc<dyn PayloadStorePort>,
    concurrency: usize,
    options: IngestOptions,
}

impl IngestUseCase {
    pub fn new(
        client: Arc<FetchClient>,
        store: Arc<dyn PayloadStorePort>,
        concurrency: usize,
        options: IngestOptions,
    ) -> Self {
        Self {
            client,
            store,
            concurrency: concurrency.max(1),
            options,
        }
    }

    /// Resolve seed players to recent match ids.
    pub async fn discover(&self, puuids: Vec<String>) -> Result<Vec<String>> {
        if puuids.is_empty() {
            return Ok(Vec::new());
        }
        let worker = Arc::new(SeedWorker {
            client: self.client.clone(),
            per_player: self.options.per_player.max(1),
            found: Mutex::new(Vec::new()),
        });
        let report = WorkerPool::new(self.concurrency).run(puuids, worker.clone()).await?;
        let mut found = std::mem::take(&mut *worker.found.lock().unwrap_or_else(|e| e.into_inner()));
        found.sort();
        found.dedup();
        info!(
            players = report.submitted,
            failed = report.failed.len(),
            matches = found.len(),
            "seed discovery finished"
        );
        Ok(found)
    }

    /// Fetch every identifier not already persisted.
    pub async fn fetch_all(&self, ids: Vec<String>) -> Result<PoolReport> {
        let worker = Arc::new(MatchWorker {
            client: self.client.clone(),
            store: self.store.clone(),
            with_timelines: self.options.with_timelines,
            queue_filter: self.options.queue_filter.clone(),
        });
        let pool = WorkerPool::new(self.concurrency);
        info!(items = ids.len(), concurrency = pool.concurrency(), "fetching matches");
        let report = pool.run(ids, worker).await?;
        info!(
            fetched = report.fetched,
            cached = report.cached,
            filtered = report.filtered,
            duplicates = report.duplicates,
            failed = report.failed.len(),
            "fetch pool finished"
        );
        Ok(report)
    }
}

struct MatchWorker {
    client: Arc<FetchClient>,
    store: Arc<dyn PayloadStorePort>,
    with_timelines: bool,
    queue_filter: QueueFilter,
}

impl MatchWorker {
    async fn persist(&self, kind: PayloadKind, id: &str, bytes: &[u8]) -> std::result::Result<(), ItemError> {
        self.store
            .put(kind, id, bytes)
            .await
            .map_err(|e| ItemError::Fatal(PipelineError::filesystem(format!("{}/{}", kind.dir_name(), id), e)))
    }
}

#[async_trait]
impl PoolWorker for MatchWorker {
    async fn already_satisfied(&self, id: &str) -> bool {
        if !self.store.contains(PayloadKind::Match, id).await {
            return false;
        }
        !self.with_timelines || self.store.contains(PayloadKind::Timeline, id).await
    }

    async fn process(&self, id: &str) -> std::result::Result<ItemOutcome, ItemError> {
        let stored = self
            .store
            .get(PayloadKind::Match, id)
            .await
            .map_err(|e| ItemError::Fatal(PipelineError::filesystem(id, e)))?;

        let mut network = false;
        let body: Value = match stored {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| FetchError::Malformed(format!("stored match {}: {}", id, e)))?,
            None => {
                let payload = self.client.fetch_match(id).await?;
                self.persist(PayloadKind::Match, id, &payload.bytes).await?;
                network = true;
                payload.body
            }
        };

        let queue_id = coerce_i64(body.pointer("/info/queueId"), 0);
        if !self.queue_filter.allows(queue_id) {
            debug!(id, queue_id, "queue filtered, timeline skipped");
            return Ok(ItemOutcome::Filtered);
        }

        if self.with_timelines && !self.store.contains(PayloadKind::Timeline, id).await {
            let timeline = self.client.fetch_timeline(id).await?;
            self.persist(PayloadKind::Timeline, id, &timeline.bytes).await?;
            network = true;
        }

        Ok(if network { ItemOutcome::Fetched } else { ItemOutcome::Cached })
    }
}

struct SeedWorker {
    client: Arc<FetchClient>,
    per_player: u32,
    found: Mutex<Vec<String>>,
}

#[async_trait]
impl PoolWorker for SeedWorker {
    async fn already_satisfied(&self, _puuid: &str) -> bool {
        false
    }

    async fn process(&self, puuid: &str) -> std::result::Result<ItemOutcome, ItemError> {
        let ids = self.client.fetch_match_ids(puuid, self.per_player).await?;
        let (valid, invalid): (Vec<String>, Vec<String>) =
            ids.into_iter().partition(|id| is_valid_identifier(id));
        if !invalid.is_empty() {
            warn!(puuid, count = invalid.len(), "ignoring malformed match ids");
        }
        self.found
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(valid);
        Ok(ItemOutcome::Fetched)
    }
}

/// Read a newline-delimited identifier list. Blank lines and `#` comments are skipped.
pub fn load_identifiers(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading identifier list {}", path.display()))
        .map_err(|e| PipelineError::Configuration(format!("{:#}", e)))?;
    Ok(parse_identifiers(&content))
}

pub fn parse_identifiers(content: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let id = line.trim();
        if id.is_empty() || id.starts_with('#') {
            continue;
        }
        if is_valid_identifier(id) {
            ids.push(id.to_string());
        } else {
            warn!(line = line_no + 1, value = id, "ignoring malformed identifier");
        }
    }
    ids
}
