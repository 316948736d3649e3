use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval gate shared by every caller of one fetch client.
///
/// Issuance is serialized: the lock is held across the wait, so concurrent
/// callers pass the gate one at a time and each pass is at least `interval`
/// after the previous one.
#[derive(Debug)]
pub struct PacingGate {
    interval: Duration,
    last_issued: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_issued: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the interval since the previous issuance has elapsed, then claim the slot.
    pub async fn acquire(&self) {
        let mut last = self.last_issued.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
