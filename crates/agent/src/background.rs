use std::future::Future;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Handle on the fire-and-forget order writes started by `place_order`.
///
/// Clones share one tracker, so a single handle can be given to every agent
/// and drained once the server stops accepting requests.
#[derive(Clone, Debug, Default)]
pub struct OrderWrites {
    tracker: TaskTracker,
}

impl OrderWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn spawn<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(write);
    }

    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `limit` for in-flight writes and returns how many were still running.
    pub async fn drain(&self, limit: Duration) -> usize {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            return 0;
        }

        info!(
            event_name = "system.shutdown.draining_writes",
            correlation_id = "shutdown",
            pending,
            "waiting for background order writes"
        );
        if tokio::time::timeout(limit, self.tracker.wait()).await.is_ok() {
            return 0;
        }

        let abandoned = self.tracker.len();
        error!(
            event_name = "system.shutdown.writes_abandoned",
            correlation_id = "shutdown",
            abandoned,
            limit_secs = limit.as_secs_f64(),
            "background order writes still running at shutdown"
        );
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::OrderWrites;

    #[tokio::test]
    async fn drain_without_writes_returns_immediately() {
        let writes = OrderWrites::new();
        assert_eq!(writes.drain(Duration::from_millis(1)).await, 0);
    }

    #[tokio::test]
    async fn drain_waits_for_running_writes() {
        let writes = OrderWrites::new();
        let gate = Arc::new(Notify::new());
        let waiter = gate.clone();
        writes.spawn(async move { waiter.notified().await });
        assert_eq!(writes.pending(), 1);

        gate.notify_one();
        assert_eq!(writes.drain(Duration::from_secs(5)).await, 0);
        assert_eq!(writes.pending(), 0);
    }

    #[tokio::test]
    async fn drain_reports_writes_that_outlive_the_limit() {
        let writes = OrderWrites::new();
        let gate = Arc::new(Notify::new());
        let waiter = gate.clone();
        writes.spawn(async move { waiter.notified().await });

        assert_eq!(writes.drain(Duration::from_millis(20)).await, 1);
    }
}
