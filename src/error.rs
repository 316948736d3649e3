use std::time::Duration;
use thiserror::Error;

/// Failure classes of a single fetch against the match API.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("transient transport failure: {0}")]
    Transient(String),

    #[error("client error: HTTP {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    /// RateLimited, ServerError and Transient are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. } | FetchError::ServerError { .. } | FetchError::Transient(_)
        )
    }

    /// Server-provided wait hint, if any.
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::ServerError { .. } => "server_error",
            FetchError::Transient(_) => "transient",
            FetchError::ClientError { .. } => "client_error",
            FetchError::Exhausted { .. } => "exhausted",
            FetchError::Transport(_) => "transport",
            FetchError::Malformed(_) => "malformed",
        }
    }
}

/// Run-level errors. Only `Configuration` and `Filesystem` abort a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    pub fn filesystem(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        PipelineError::Filesystem {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::RateLimited { retry_after: None }.is_retryable());
        assert!(FetchError::ServerError { status: 503 }.is_retryable());
        assert!(FetchError::Transient("timeout".into()).is_retryable());
        assert!(!FetchError::ClientError { status: 404, body: String::new() }.is_retryable());
        assert!(!FetchError::Exhausted { attempts: 3, last: "x".into() }.is_retryable());
        assert!(!FetchError::Malformed("bad".into()).is_retryable());
    }

    #[test]
    fn test_retry_hint_only_for_rate_limit() {
        let hinted = FetchError::RateLimited { retry_after: Some(Duration::from_secs(2)) };
        assert_eq!(hinted.retry_hint(), Some(Duration::from_secs(2)));
        assert_eq!(FetchError::ServerError { status: 500 }.retry_hint(), None);
    }
}
