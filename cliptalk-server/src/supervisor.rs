//! Restarts long-running pipeline tasks that panic

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Delay before restart number `restarts`: 100ms, 200ms, 400ms, ... capped at 5s
pub fn restart_delay(restarts: u32) -> Duration {
    let backoff_ms = (100u64 << restarts.saturating_sub(1).min(6)).min(5000);
    Duration::from_millis(backoff_ms)
}

/// Run the task produced by `factory`, spawning a fresh one whenever it panics.
///
/// Returns once a run finishes normally or is cancelled.
pub fn supervise<F, Fut>(name: &'static str, mut factory: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut restarts = 0u32;
        loop {
            match tokio::spawn(factory()).await {
                Ok(()) => {
                    info!("{} finished", name);
                    return;
                }
                Err(e) if e.is_panic() => {
                    restarts = restarts.saturating_add(1);
                    let delay = restart_delay(restarts);
                    error!(
                        "{} panicked (restart {}); restarting in {:?}",
                        name, restarts, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("{} was cancelled: {}", name, e);
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_restart_delay_grows_and_caps() {
        assert_eq!(restart_delay(1), Duration::from_millis(100));
        assert_eq!(restart_delay(2), Duration::from_millis(200));
        assert_eq!(restart_delay(4), Duration::from_millis(800));
        assert_eq!(restart_delay(30), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_panicking_task_is_restarted() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();

        let handle = supervise("flaky", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    panic!("boom");
                }
            }
        });

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
