//! Cancellable set of spawned timer tasks.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Owns the join handles of every timer a session spawned. Dropping the set
/// aborts whatever is still running.
#[derive(Debug, Default)]
pub struct TaskSet {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Abort everything; returns how many tasks were still live.
    pub fn cancel_all(&self) -> usize {
        let mut handles = self.lock();
        let live = handles.iter().filter(|h| !h.is_finished()).count();
        for handle in handles.drain(..) {
            handle.abort();
        }
        live
    }

    pub fn active(&self) -> usize {
        self.lock().iter().filter(|h| !h.is_finished()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        // Poisoned only if a holder panicked; the Vec is still consistent.
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_aborts_pending() {
        let tasks = TaskSet::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel::<u32>(4);
        for i in 0..3 {
            let tx = tx.clone();
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                let _ = tx.send(i).await;
            });
        }
        drop(tx);
        assert_eq!(tasks.active(), 3);
        assert_eq!(tasks.cancel_all(), 3);

        // Senders are dropped with the aborted tasks
        let next = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(matches!(next, Ok(None)));
        assert_eq!(tasks.active(), 0);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_pruned() {
        let tasks = TaskSet::new();
        tasks.spawn(async {});
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        assert_eq!(tasks.active(), 1);
        assert_eq!(tasks.cancel_all(), 1);
    }
}
