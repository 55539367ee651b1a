//! Lifecycle-scoped background tasks

use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Receiver side of a poller's stop signal.
///
/// `stopped()` resolves once the owning [`PollerHandle`] is shut down or dropped.
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Wait until the poller should stop
    pub async fn stopped(&mut self) {
        // Err means the handle was dropped, which also stops the task
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Owns a spawned polling task; dropping it stops the task
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Spawn `body` with a stop signal tied to the returned handle
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn(body(StopSignal { rx }));
        Self {
            stop,
            task: Some(task),
        }
    }

    /// Request a stop and wait for the task to exit
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let handle = PollerHandle::spawn(|mut stop| async move {
            loop {
                tokio::select! {
                    _ = stop.stopped() => break,
                    _ = tokio::time::sleep(Duration::from_millis(5)) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await;
        let after = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after);
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let handle = PollerHandle::spawn(|mut stop| async move {
            stop.stopped().await;
            let _ = done_tx.send(());
        });
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .expect("task did not observe drop")
            .unwrap();
    }
}
