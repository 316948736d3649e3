// Pipeline ingestion: pacing, retries, the match API client and the worker pool

pub mod fetch_client;
pub mod rate_limiter;
pub mod retry;
pub mod worker_pool;

pub use fetch_client::{FetchClient, RawPayload};
pub use rate_limiter::PacingGate;
pub use retry::RetryPolicy;
pub use worker_pool::{ItemError, ItemOutcome, PoolReport, PoolWorker, WorkerPool};
