//! Shutdown coordination for the relay.
//!
//! The stop request is latched: a trigger that fires before anyone waits is
//! still seen by every later waiter.

use std::sync::Arc;

use tokio::sync::watch;

/// Handle that can request a stop. Cheap to clone.
#[derive(Clone)]
pub struct Shutdown {
    stopped: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            stopped: Arc::new(stopped),
        }
    }

    /// Request a stop. Idempotent; works with no waiters yet.
    pub fn trigger(&self) {
        self.stopped.send_replace(true);
    }

    /// A future-producing view for one long-running task.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            stopped: self.stopped.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for the stop request of the [`Shutdown`] it came from.
pub struct ShutdownSignal {
    stopped: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once a stop was requested, immediately if it already was.
    /// Dropping every [`Shutdown`] handle counts as a stop.
    pub async fn wait(mut self) {
        let _ = self.stopped.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_waiter() {
        let shutdown = Shutdown::new();
        let a = shutdown.signal();
        let b = shutdown.clone().signal();

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            a.wait().await;
            b.wait().await;
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_before_wait_is_not_lost() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), shutdown.signal().wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_untriggered_signal_keeps_waiting() {
        let shutdown = Shutdown::new();
        let waited =
            tokio::time::timeout(Duration::from_millis(100), shutdown.signal().wait()).await;
        assert!(waited.is_err());
    }
}
