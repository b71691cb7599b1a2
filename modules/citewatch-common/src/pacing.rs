use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval gate for one remote endpoint client.
///
/// Holds the earliest instant the next call may leave. `wait` sleeps until then and
/// pushes the instant forward by `min_interval`. The lock is held across the sleep,
/// so callers sharing one gate are serialized. Separate gates for the same endpoint
/// (e.g. two orchestrator processes) do not coordinate.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// Block until the interval since the previous call has elapsed, then claim the slot.
    pub async fn wait(&self) {
        let mut next = self.next_allowed.lock().await;
        if let Some(at) = *next {
            tokio::time::sleep_until(at).await;
        }
        *next = Some(Instant::now() + self.min_interval);
    }
}
