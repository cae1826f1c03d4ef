//! services/client/src/app/poller.rs
//!
//! The repeating background task that keeps a session's file list fresh.
//! It is bound to a `CancellationToken` so the owner can stop it when the
//! session ends.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A running poller. Dropping the handle cancels the task.
pub struct PollerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels the task and waits for it to wind down.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawns a task that calls `tick` every `every`, starting one period from
/// now.
///
/// `tick` returns `None` once whatever it polls for is gone, which ends the
/// task. A tick still in flight when the token is cancelled is abandoned.
pub fn spawn_poller<F, Fut>(every: Duration, mut tick: F) -> PollerHandle
where
    F: FnMut() -> Option<Fut> + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let task = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let Some(work) = tick() else {
                debug!("Poll target dropped; stopping poller.");
                return;
            };
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = work => {}
            }
        }
        debug!("Poller cancelled.");
    });

    PollerHandle { token, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_on_the_interval_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = spawn_poller(Duration::from_secs(4), move || {
            let counter = counter.clone();
            Some(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0, "first tick waits one period");

        time::sleep(Duration::from_secs(12)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_running());

        time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_target_is_gone() {
        let handle = spawn_poller(Duration::from_secs(1), || None::<std::future::Ready<()>>);
        time::sleep(Duration::from_millis(1_100)).await;
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = spawn_poller(Duration::from_secs(1), move || {
            let counter = counter.clone();
            Some(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        drop(handle);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
