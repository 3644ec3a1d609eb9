//! Cooperative stop signal shared by the workers of one polling session.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// One-shot stop flag with interruptible waits.
///
/// Each polling session gets a fresh signal, so raising it never affects a
/// session started afterwards.
#[derive(Debug, Clone)]
pub struct StopSignal {
    raised: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (raised, _) = watch::channel(false);
        Self {
            raised: Arc::new(raised),
        }
    }

    /// Raises the signal. Idempotent.
    pub fn raise(&self) {
        self.raised.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.raised.borrow()
    }

    /// Sleeps for `duration` unless the signal is raised first.
    ///
    /// Returns `true` if the signal is raised when the wait ends.
    pub async fn wait(&self, duration: Duration) -> bool {
        let mut observer = self.raised.subscribe();
        if *observer.borrow_and_update() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_raised(),
            changed = observer.wait_for(|raised| *raised) => changed.is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_runs_full_duration_when_not_raised() {
        let stop = StopSignal::new();
        let started = Instant::now();
        assert!(!stop.wait(Duration::from_secs(5)).await);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_raise_interrupts_wait() {
        let stop = StopSignal::new();
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let raised = stop.wait(Duration::from_secs(300)).await;
                (raised, started.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.raise();
        let (raised, waited) = waiter.await.unwrap();
        assert!(raised);
        assert!(waited < Duration::from_secs(1));

        // Already raised: returns immediately
        assert!(stop.wait(Duration::from_secs(300)).await);
        assert!(stop.is_raised());
    }
}
