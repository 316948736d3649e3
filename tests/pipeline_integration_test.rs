use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

use match_stats::app::aggregate_use_case::run_aggregation;
use match_stats::app::ingest_use_case::{IngestOptions, IngestUseCase};
use match_stats::app::normalize_use_case::NormalizeUseCase;
use match_stats::app::ports::{HttpClientPort, HttpGetResult, PayloadStorePort, TransportError};
use match_stats::app::QueueFilter;
use match_stats::constants::API_KEY_HEADER;
use match_stats::infra::payload_store::FsPayloadStore;
use match_stats::pipeline::ingestion::{FetchClient, PacingGate, RetryPolicy};
use match_stats::pipeline::processing::normalize::MatchNormalizer;
use match_stats::types::{ChampionRow, CompactIndexEntry, QueueRow, RunMetadata};

const BASE: &str = "http://riot.test";

/// Serves fixed bodies by URL and records every call.
struct FakeRiotApi {
    routes: HashMap<String, (u16, String)>,
    calls: Mutex<Vec<String>>,
}

impl FakeRiotApi {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_match(mut self, id: &str, queue: i64, version: &str, blue_win: Value) -> Self {
        self.routes.insert(
            format!("{}/lol/match/v5/matches/{}", BASE, id),
            (200, raw_match(id, queue, version, blue_win).to_string()),
        );
        self
    }

    fn with_status(mut self, id: &str, status: u16) -> Self {
        self.routes.insert(
            format!("{}/lol/match/v5/matches/{}", BASE, id),
            (status, "{\"status\":{\"message\":\"Forbidden\"}}".to_string()),
        );
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClientPort for FakeRiotApi {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpGetResult, TransportError> {
        assert!(headers.iter().any(|(k, v)| *k == API_KEY_HEADER && *v == "it-key"));
        self.calls.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .routes
            .get(url)
            .cloned()
            .unwrap_or((404, "{}".to_string()));
        Ok(HttpGetResult {
            status,
            bytes: body.into_bytes(),
            content_type: "application/json".to_string(),
            retry_after: None,
        })
    }
}

fn raw_match(id: &str, queue: i64, version: &str, blue_win: Value) -> Value {
    let blue_won = blue_win == json!(true) || blue_win == json!("Win");
    let participants: Vec<Value> = (1..=10)
        .map(|pid| {
            let team = if pid <= 5 { 100 } else { 200 };
            json!({
                "puuid": format!("puuid-{}", pid),
                "participantId": pid,
                "teamId": team,
                "win": (team == 100) == blue_won,
                "championId": 100 + pid,
                "championName": format!("Champ{}", pid),
                "kills": 2, "deaths": 1, "assists": 4,
                "goldEarned": 9000,
                "totalDamageDealtToChampions": 12000,
                "totalMinionsKilled": 120,
                "neutralMinionsKilled": 8,
                "visionScore": 15,
                "item0": 1001
            })
        })
        .collect();
    json!({
        "metadata": { "matchId": id },
        "info": {
            "platformId": "EUW1",
            "gameCreation": 1_706_000_000_000_i64,
            "gameStartTimestamp": 1_706_000_060_000_i64,
            "gameEndTimestamp": 1_706_001_860_000_i64,
            "gameDuration": 1800,
            "gameMode": "CLASSIC",
            "gameType": "MATCHED_GAME",
            "queueId": queue,
            "gameVersion": version,
            "participants": participants,
            "teams": [
                { "teamId": 100, "win": blue_win },
                { "teamId": 200, "win": !blue_won }
            ]
        }
    })
}

fn client(api: Arc<FakeRiotApi>) -> Arc<FetchClient> {
    Arc::new(FetchClient::new(
        api,
        Arc::new(PacingGate::new(Duration::from_millis(50))),
        RetryPolicy::new(3, Duration::from_millis(100), 2.0, Duration::from_secs(1)),
        "it-key",
        BASE,
    ))
}

fn read<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> T {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn ingest_normalize_aggregate_end_to_end() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let out = dir.path().join("out");
    let api = Arc::new(
        FakeRiotApi::new()
            .with_match("EUW1_100", 420, "14.2.556.1", json!("Win"))
            .with_match("EUW1_101", 420, "14.3.1", json!(false))
            .with_match("EUW1_102", 450, "14.3.1", json!(true))
            .with_status("EUW1_103", 403),
    );
    let store: Arc<dyn PayloadStorePort> = Arc::new(FsPayloadStore::new(&data));

    let ids: Vec<String> = ["EUW1_100", "EUW1_101", "EUW1_100", "EUW1_102", "EUW1_103", "EUW1_101"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let ingest = IngestUseCase::new(client(api.clone()), store.clone(), 3, IngestOptions::default());
    let report = ingest.fetch_all(ids).await.unwrap();

    // one request per distinct identifier; the 403 is not retried
    assert_eq!(api.calls().len(), 4);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.duplicates, 2);
    assert_eq!(report.failed.len(), 1);

    let canonical = data.join("matches.ndjson");
    let normalize = NormalizeUseCase::new(Box::new(MatchNormalizer), store.clone(), QueueFilter::default());
    let norm = normalize.run(&canonical).await.unwrap();
    assert_eq!(norm.appended, 3);

    let generated_at = Utc.with_ymd_and_hms(2024, 1, 24, 0, 0, 0).unwrap();
    let agg = run_aggregation(&canonical, &out, generated_at).unwrap();
    assert_eq!(agg.matches, 3);

    let metadata: RunMetadata = read(&out.join("metadata.json"));
    assert_eq!(metadata.match_count, 3);
    assert_eq!(metadata.participant_count, 30);
    assert_eq!(metadata.dropped_lines, 0);

    let index: Vec<CompactIndexEntry> = read(&out.join("match_index.json"));
    let first = index.iter().find(|e| e.match_id == "EUW1_100").unwrap();
    assert!(first.blue_win);
    assert!(!first.red_win);
    assert_eq!(first.patch, "14.2");

    let queues: Vec<QueueRow> = read(&out.join("queues.json"));
    assert_eq!(queues.iter().map(|q| q.queue_id).collect::<Vec<_>>(), vec![420, 450]);
    assert_eq!(queues[0].stats.games, 2);
    assert_eq!(queues[0].stats.blue_wins, 1);
    assert_eq!(queues[0].stats.blue_win_rate, 0.5);

    let champions: Vec<ChampionRow> = read(&out.join("champions.json"));
    assert_eq!(champions.len(), 10);
    assert!(champions.iter().all(|c| c.games == 3));
}

#[tokio::test(start_paused = true)]
async fn rerun_resumes_without_network_or_duplicate_lines() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let api = Arc::new(
        FakeRiotApi::new()
            .with_match("EUW1_1", 420, "14.2.1", json!(true))
            .with_match("EUW1_2", 420, "14.2.1", json!(false)),
    );
    let store: Arc<dyn PayloadStorePort> = Arc::new(FsPayloadStore::new(&data));
    let ids = vec!["EUW1_1".to_string(), "EUW1_2".to_string()];
    let canonical = data.join("matches.ndjson");

    for _ in 0..2 {
        let ingest = IngestUseCase::new(client(api.clone()), store.clone(), 2, IngestOptions::default());
        ingest.fetch_all(ids.clone()).await.unwrap();
        NormalizeUseCase::new(Box::new(MatchNormalizer), store.clone(), QueueFilter::default())
            .run(&canonical)
            .await
            .unwrap();
    }

    assert_eq!(api.calls().len(), 2);
    let lines = std::fs::read_to_string(&canonical).unwrap();
    assert_eq!(lines.lines().count(), 2);
}

#[tokio::test(start_paused = true)]
async fn requests_respect_the_shared_pacing_interval() {
    let dir = tempdir().unwrap();
    let mut api = FakeRiotApi::new();
    let ids: Vec<String> = (0..6).map(|i| format!("EUW1_{}", i)).collect();
    for id in &ids {
        api = api.with_match(id, 420, "14.2.1", json!(true));
    }
    let api = Arc::new(api);
    let store: Arc<dyn PayloadStorePort> = Arc::new(FsPayloadStore::new(dir.path()));

    let started = tokio::time::Instant::now();
    let ingest = IngestUseCase::new(client(api.clone()), store, 6, IngestOptions::default());
    ingest.fetch_all(ids).await.unwrap();

    // six requests through one gate: five full intervals between them
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(api.calls().len(), 6);
}
