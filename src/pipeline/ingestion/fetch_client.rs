use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::app::ports::{HttpClientPort, HttpGetResult, TransportError};
use crate::constants::API_KEY_HEADER;
use crate::error::FetchError;
use crate::pipeline::ingestion::rate_limiter::PacingGate;
use crate::pipeline::ingestion::retry::RetryPolicy;

const BODY_SNIPPET_CHARS: usize = 200;

/// A successful response: the verbatim bytes plus their parsed form.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub bytes: Vec<u8>,
    pub body: serde_json::Value,
}

/// Match API client. Every attempt, retries included, passes the shared pacing gate.
pub struct FetchClient {
    http: Arc<dyn HttpClientPort>,
    gate: Arc<PacingGate>,
    retry: RetryPolicy,
    api_key: String,
    base_url: String,
}

impl FetchClient {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        gate: Arc<PacingGate>,
        retry: RetryPolicy,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            gate,
            retry,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn match_url(&self, match_id: &str) -> String {
        format!("{}/lol/match/v5/matches/{}", self.base_url, match_id)
    }

    pub fn timeline_url(&self, match_id: &str) -> String {
        format!("{}/lol/match/v5/matches/{}/timeline", self.base_url, match_id)
    }

    pub fn match_ids_url(&self, puuid: &str, count: u32) -> String {
        format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids?start=0&count={}",
            self.base_url, puuid, count
        )
    }

    pub async fn fetch_match(&self, match_id: &str) -> Result<RawPayload, FetchError> {
        self.get_json(&self.match_url(match_id)).await
    }

    pub async fn fetch_timeline(&self, match_id: &str) -> Result<RawPayload, FetchError> {
        self.get_json(&self.timeline_url(match_id)).await
    }

    /// Recent match ids for one player, newest first.
    pub async fn fetch_match_ids(&self, puuid: &str, count: u32) -> Result<Vec<String>, FetchError> {
        let payload = self.get_json(&self.match_ids_url(puuid, count)).await?;
        serde_json::from_value(payload.body)
            .map_err(|e| FetchError::Malformed(format!("match id list: {}", e)))
    }

    /// GET with pacing, classification and the retry policy.
    pub async fn get_json(&self, url: &str) -> Result<RawPayload, FetchError> {
        self.retry.run(url, || self.attempt(url)).await
    }

    async fn attempt(&self, url: &str) -> Result<RawPayload, FetchError> {
        self.gate.acquire().await;
        let t0 = Instant::now();
        let headers = [(API_KEY_HEADER, self.api_key.as_str())];
        let result = match self.http.get(url, &headers).await {
            Ok(resp) => classify_response(resp),
            Err(e) => Err(classify_transport(e)),
        };
        match &result {
            Ok(_) => crate::metrics::fetch::request_success(t0.elapsed().as_secs_f64()),
            Err(e) => {
                debug!(%url, error = %e, "request failed");
                crate::metrics::fetch::request_error(e.kind());
            }
        }
        let bytes = result?;
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Malformed(format!("{}: {}", url, e)))?;
        Ok(RawPayload { bytes, body })
    }
}

fn classify_transport(e: TransportError) -> FetchError {
    match e {
        TransportError::Timeout(msg) | TransportError::Connect(msg) => FetchError::Transient(msg),
        TransportError::Other(msg) => FetchError::Transport(msg),
    }
}

/// Map a response to its body or a failure class.
pub fn classify_response(resp: HttpGetResult) -> Result<Vec<u8>, FetchError> {
    match resp.status {
        200..=299 => Ok(resp.bytes),
        429 => Err(FetchError::RateLimited {
            retry_after: resp.retry_after.as_deref().and_then(parse_retry_after),
        }),
        408 => Err(FetchError::Transient("HTTP 408 request timeout".to_string())),
        status if status >= 500 => Err(FetchError::ServerError { status }),
        status => Err(FetchError::ClientError {
            status,
            body: body_snippet(&resp.bytes),
        }),
    }
}

/// `Retry-After` as delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<f64>() {
        // negative, non-finite and out-of-range values are ignored
        return Duration::try_from_secs_f64(secs).ok();
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

fn body_snippet(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut snippet: String = text.chars().take(BODY_SNIPPET_CHARS).collect();
    if text.chars().count() > BODY_SNIPPET_CHARS {
        snippet.push('…');
    }
    snippet
}
