use async_trait::async_trait;

// Ingest-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpGetResult, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Raw `Retry-After` header value
    pub retry_after: Option<String>,
}

/// Failure below the HTTP status layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    Timeout(String),
    Connect(String),
    Other(String),
}

/// Which raw payload family an identifier refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Match,
    Timeline,
}

impl PayloadKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            PayloadKind::Match => crate::constants::MATCH_DIR,
            PayloadKind::Timeline => crate::constants::TIMELINE_DIR,
        }
    }
}

/// Raw payload store keyed by identifier. Payloads are written once and never mutated.
#[async_trait]
pub trait PayloadStorePort: Send + Sync {
    async fn contains(&self, kind: PayloadKind, id: &str) -> bool;
    async fn get(&self, kind: PayloadKind, id: &str) -> std::io::Result<Option<Vec<u8>>>;
    async fn put(&self, kind: PayloadKind, id: &str, bytes: &[u8]) -> std::io::Result<()>;
    /// Stored identifiers in ascending order
    async fn list_ids(&self, kind: PayloadKind) -> std::io::Result<Vec<String>>;
}
