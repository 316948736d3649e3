use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info_span, warn, Instrument};

use crate::error::{FetchError, PipelineError};

/// Why an item did not complete.
#[derive(Debug)]
pub enum ItemError {
    /// Logged and skipped; siblings continue
    Skip(FetchError),
    /// Aborts the whole run (e.g. the raw store cannot be written)
    Fatal(PipelineError),
}

impl From<FetchError> for ItemError {
    fn from(e: FetchError) -> Self {
        ItemError::Skip(e)
    }
}

impl From<PipelineError> for ItemError {
    fn from(e: PipelineError) -> Self {
        ItemError::Fatal(e)
    }
}

/// Per-item work run by the pool.
#[async_trait]
pub trait PoolWorker: Send + Sync + 'static {
    /// True when a persisted result already exists; the item then costs no network call.
    async fn already_satisfied(&self, id: &str) -> bool;

    async fn process(&self, id: &str) -> Result<ItemOutcome, ItemError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Fetched,
    /// Persisted result found, skipped
    Cached,
    /// Fetched but rejected by a filter; follow-up fetches skipped
    Filtered,
}

impl ItemOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Fetched => "fetched",
            ItemOutcome::Cached => "cached",
            ItemOutcome::Filtered => "filtered",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PoolReport {
    pub submitted: usize,
    pub duplicates: usize,
    pub fetched: usize,
    pub cached: usize,
    pub filtered: usize,
    /// (identifier, error) for items that were skipped after an unrecoverable failure
    pub failed: Vec<(String, String)>,
}

impl PoolReport {
    fn record(&mut self, id: String, result: Result<ItemOutcome, FetchError>) {
        match result {
            Ok(outcome) => {
                crate::metrics::pool::item_finished(outcome.as_str());
                match outcome {
                    ItemOutcome::Fetched => self.fetched += 1,
                    ItemOutcome::Cached => self.cached += 1,
                    ItemOutcome::Filtered => self.filtered += 1,
                }
            }
            Err(e) => {
                crate::metrics::pool::item_finished("failed");
                warn!(id = %id, kind = e.kind(), error = %e, "item skipped");
                self.failed.push((id, e.to_string()));
            }
        }
    }
}

/// Runs at most `concurrency` items at once and never runs an identifier twice.
///
/// The claimed set belongs to the pool instance, so repeated `run` calls on
/// one pool also skip identifiers handled earlier.
pub struct WorkerPool {
    concurrency: usize,
    claimed: Mutex<HashSet<String>>,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Insert-if-absent under one lock, so two checks can never both win.
    fn claim(&self, id: &str) -> bool {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        claimed.insert(id.to_string())
    }

    /// Run every item; returns early only on a fatal item error, after
    /// aborting the items still in flight.
    pub async fn run<W: PoolWorker>(
        &self,
        items: Vec<String>,
        worker: Arc<W>,
    ) -> Result<PoolReport, PipelineError> {
        let mut report = PoolReport {
            submitted: items.len(),
            ..Default::default()
        };
        let mut in_flight: JoinSet<(String, Result<ItemOutcome, ItemError>)> = JoinSet::new();

        for id in items {
            if !self.claim(&id) {
                debug!(id = %id, "duplicate identifier skipped");
                crate::metrics::pool::duplicate_skipped();
                report.duplicates += 1;
                continue;
            }
            while in_flight.len() >= self.concurrency {
                if let Some(joined) = in_flight.join_next().await {
                    if let Err(fatal) = Self::collect(&mut report, joined) {
                        in_flight.shutdown().await;
                        return Err(fatal);
                    }
                }
            }
            let worker = worker.clone();
            let span = info_span!("pool_item", id = %id);
            in_flight.spawn(
                async move {
                    let result = if worker.already_satisfied(&id).await {
                        Ok(ItemOutcome::Cached)
                    } else {
                        worker.process(&id).await
                    };
                    (id, result)
                }
                .instrument(span),
            );
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(fatal) = Self::collect(&mut report, joined) {
                in_flight.shutdown().await;
                return Err(fatal);
            }
        }
        Ok(report)
    }

    fn collect(
        report: &mut PoolReport,
        joined: Result<(String, Result<ItemOutcome, ItemError>), tokio::task::JoinError>,
    ) -> Result<(), PipelineError> {
        match joined {
            Ok((id, Ok(outcome))) => report.record(id, Ok(outcome)),
            Ok((id, Err(ItemError::Skip(e)))) => report.record(id, Err(e)),
            Ok((id, Err(ItemError::Fatal(e)))) => {
                warn!(id = %id, error = %e, "fatal item error, aborting pool");
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "worker task aborted");
                report.failed.push(("<unknown>".to_string(), e.to_string()));
            }
        }
        Ok(())
    }
}
