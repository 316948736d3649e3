use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::app::ports::{PayloadKind, PayloadStorePort};
use crate::app::QueueFilter;
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::normalize::Normalizer;
use crate::pipeline::storage::canonical_log::{existing_ids, CanonicalLogWriter};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeReport {
    pub scanned: u64,
    pub appended: u64,
    pub already_present: u64,
    pub malformed: u64,
    pub rejected: u64,
    pub filtered: u64,
}

/// Turns persisted raw payloads into canonical NDJSON lines, once per match.
pub struct NormalizeUseCase {
    normalizer: Box<dyn Normalizer + Send + Sync>,
    store: Arc<dyn PayloadStorePort>,
    queue_filter: QueueFilter,
}

impl NormalizeUseCase {
    pub fn new(
        normalizer: Box<dyn Normalizer + Send + Sync>,
        store: Arc<dyn PayloadStorePort>,
        queue_filter: QueueFilter,
    ) -> Self {
        Self {
            normalizer,
            store,
            queue_filter,
        }
    }

    /// Append every raw match not yet in the canonical log.
    pub async fn run(&self, canonical_path: &Path) -> Result<NormalizeReport> {
        let mut report = NormalizeReport::default();
        let mut seen = existing_ids(canonical_path)
            .map_err(|e| PipelineError::filesystem(canonical_path, e))?;
        let ids = self
            .store
            .list_ids(PayloadKind::Match)
            .await
            .map_err(|e| PipelineError::filesystem(PayloadKind::Match.dir_name(), e))?;
        let mut writer = CanonicalLogWriter::open_append(canonical_path)
            .map_err(|e| PipelineError::filesystem(canonical_path, e))?;

        for id in ids {
            report.scanned += 1;
            if seen.contains(&id) {
                report.already_present += 1;
                crate::metrics::normalize::record_outcome("already_present");
                continue;
            }

            let Some(raw) = self.load(PayloadKind::Match, &id).await? else {
                report.malformed += 1;
                crate::metrics::normalize::record_outcome("malformed");
                continue;
            };
            let timeline = self.load(PayloadKind::Timeline, &id).await?;

            let record = match self.normalizer.normalize(&raw, timeline.as_ref()) {
                Ok(record) => record,
                Err(rejection) => {
                    warn!(id = %id, reason = %rejection, "payload rejected");
                    report.rejected += 1;
                    crate::metrics::normalize::record_outcome("rejected");
                    continue;
                }
            };
            if !self.queue_filter.allows(record.queue_id) {
                debug!(id = %id, queue_id = record.queue_id, "queue filtered");
                report.filtered += 1;
                crate::metrics::normalize::record_outcome("filtered");
                continue;
            }
            // The payload's own id decides membership; a renamed file must not duplicate a line
            if !seen.insert(record.match_id.clone()) {
                report.already_present += 1;
                crate::metrics::normalize::record_outcome("already_present");
                continue;
            }

            writer
                .append(&record)
                .map_err(|e| PipelineError::filesystem(canonical_path, e))?;
            report.appended += 1;
            crate::metrics::normalize::record_outcome("appended");
        }

        writer
            .finish()
            .map_err(|e| PipelineError::filesystem(canonical_path, e))?;
        info!(
            scanned = report.scanned,
            appended = report.appended,
            already_present = report.already_present,
            malformed = report.malformed,
            rejected = report.rejected,
            filtered = report.filtered,
            "normalization finished"
        );
        Ok(report)
    }

    /// Read and parse one payload; unparseable content yields `None`.
    async fn load(&self, kind: PayloadKind, id: &str) -> Result<Option<Value>> {
        let bytes = self
            .store
            .get(kind, id)
            .await
            .map_err(|e| PipelineError::filesystem(format!("{}/{}", kind.dir_name(), id), e))?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(id, kind = kind.dir_name(), error = %e, "unparseable payload ignored");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::payload_store::FsPayloadStore;
    use crate::pipeline::processing::normalize::tests::sample_match;
    use crate::pipeline::processing::normalize::MatchNormalizer;
    use crate::types::CanonicalRecord;
    use serde_json::json;
    use tempfile::tempdir;

    async fn seeded_store(root: &Path) -> Arc<dyn PayloadStorePort> {
        let store = FsPayloadStore::new(root);
        for (id, queue) in [("EUW1_1", 420), ("EUW1_2", 450), ("EUW1_3", 420)] {
            let body = sample_match(id, 1_706_000_000_000, queue, "14.2.1", json!("Win"));
            store.put(PayloadKind::Match, id, body.to_string().as_bytes()).await.unwrap();
        }
        store.put(PayloadKind::Match, "EUW1_4", b"{truncated").await.unwrap();
        store.put(PayloadKind::Match, "EUW1_5", b"[1,2]").await.unwrap();
        Arc::new(store)
    }

    fn read_records(path: &Path) -> Vec<CanonicalRecord> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_normalize_counts_and_appends() {
        let dir = tempdir().unwrap();
        let store = seeded_store(&dir.path().join("raw")).await;
        let log = dir.path().join("matches.ndjson");
        let use_case = NormalizeUseCase::new(Box::new(MatchNormalizer), store, QueueFilter::new([420]));

        let report = use_case.run(&log).await.unwrap();
        assert_eq!(report.scanned, 5);
        assert_eq!(report.appended, 2);
        assert_eq!(report.filtered, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.rejected, 1);

        let records = read_records(&log);
        let ids: Vec<&str> = records.iter().map(|r| r.match_id.as_str()).collect();
        assert_eq!(ids, vec!["EUW1_1", "EUW1_3"]);
        assert!(records[0].team_won(100));
    }

    #[tokio::test]
    async fn test_rerun_appends_nothing() {
        let dir = tempdir().unwrap();
        let store = seeded_store(&dir.path().join("raw")).await;
        let log = dir.path().join("matches.ndjson");
        let use_case = NormalizeUseCase::new(Box::new(MatchNormalizer), store, QueueFilter::default());

        let first = use_case.run(&log).await.unwrap();
        assert_eq!(first.appended, 3);
        let before = std::fs::read(&log).unwrap();

        let second = use_case.run(&log).await.unwrap();
        assert_eq!(second.appended, 0);
        assert_eq!(second.already_present, 3);
        assert_eq!(std::fs::read(&log).unwrap(), before);
    }

    #[tokio::test]
    async fn test_timeline_feeds_snapshots() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("raw");
        let store = FsPayloadStore::new(&raw);
        let body = sample_match("EUW1_9", 1_706_000_000_000, 420, "14.2.1", json!(true));
        store.put(PayloadKind::Match, "EUW1_9", body.to_string().as_bytes()).await.unwrap();
        let frames: Vec<Value> = (0..=15)
            .map(|minute| {
                let pf: serde_json::Map<String, Value> = (1..=10)
                    .map(|pid| {
                        (
                            pid.to_string(),
                            json!({"totalGold": 100 * minute, "xp": 50, "level": 2,
                                   "minionsKilled": minute, "jungleMinionsKilled": 0}),
                        )
                    })
                    .collect();
                json!({"participantFrames": pf})
            })
            .collect();
        let timeline = json!({"info": {"frames": frames}});
        store.put(PayloadKind::Timeline, "EUW1_9", timeline.to_string().as_bytes()).await.unwrap();

        let log = dir.path().join("matches.ndjson");
        let use_case = NormalizeUseCase::new(Box::new(MatchNormalizer), Arc::new(store), QueueFilter::default());
        use_case.run(&log).await.unwrap();

        let records = read_records(&log);
        let blue = records[0].teams.iter().find(|t| t.team_id == 100).unwrap();
        assert_eq!(blue.snapshots.len(), 2);
        assert_eq!(blue.snapshots[0].minute, 10);
        assert_eq!(blue.snapshots[0].total_gold, 5 * 1000);
    }
}
