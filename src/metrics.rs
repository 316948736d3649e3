//! Pipeline metrics
//!
//! Counters and histograms recorded through the `metrics` facade. Nothing is
//! exported unless `init_metrics` installs the Prometheus listener.

use std::net::SocketAddr;
use tracing::{info, warn};

/// Install the Prometheus exporter when `MATCH_STATS_METRICS_PORT` is set.
pub fn init_metrics() {
    let Some(port) = std::env::var("MATCH_STATS_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return;
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

pub mod fetch {
    pub fn request_success(duration_secs: f64) {
        ::metrics::counter!("match_stats_fetch_requests_total", "outcome" => "success").increment(1);
        ::metrics::histogram!("match_stats_fetch_request_duration_seconds").record(duration_secs);
    }

    pub fn request_error(kind: &'static str) {
        ::metrics::counter!("match_stats_fetch_requests_total", "outcome" => kind).increment(1);
    }

    pub fn retry_scheduled(kind: &'static str) {
        ::metrics::counter!("match_stats_fetch_retries_total", "kind" => kind).increment(1);
    }
}

pub mod pool {
    pub fn item_finished(outcome: &'static str) {
        ::metrics::counter!("match_stats_pool_items_total", "outcome" => outcome).increment(1);
    }

    pub fn duplicate_skipped() {
        ::metrics::counter!("match_stats_pool_duplicates_total").increment(1);
    }
}

pub mod normalize {
    pub fn record_outcome(outcome: &'static str) {
        ::metrics::counter!("match_stats_normalize_records_total", "outcome" => outcome).increment(1);
    }
}

pub mod aggregate {
    pub fn line_read() {
        ::metrics::counter!("match_stats_aggregate_lines_total", "outcome" => "folded").increment(1);
    }

    pub fn line_dropped() {
        ::metrics::counter!("match_stats_aggregate_lines_total", "outcome" => "dropped").increment(1);
    }
}
