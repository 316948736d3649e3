pub mod aggregate_use_case;
pub mod ingest_use_case;
pub mod normalize_use_case;
pub mod ports;

use std::collections::BTreeSet;

/// Allowed queue ids; empty allows every queue.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter(BTreeSet<i64>);

impl QueueFilter {
    pub fn new(queues: impl IntoIterator<Item = i64>) -> Self {
        Self(queues.into_iter().collect())
    }

    pub fn allows(&self, queue_id: i64) -> bool {
        self.0.is_empty() || self.0.contains(&queue_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_filter() {
        assert!(QueueFilter::default().allows(450));
        let ranked = QueueFilter::new([420, 440]);
        assert!(ranked.allows(420));
        assert!(!ranked.allows(450));
    }
}
