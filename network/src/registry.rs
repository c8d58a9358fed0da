//! Registry of inbound connection tasks, kept so shutdown can abort them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

/// Running inbound connection tasks by id.
///
/// A task removes itself when it finishes. The lock is never held across
/// an await, so a plain mutex is enough.
#[derive(Default)]
pub struct InboundRegistry {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, AbortHandle>>,
}

impl InboundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` as a registered inbound connection. Returns its id.
    pub fn spawn<F>(self: &Arc<Self>, task: F) -> u64
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(self);

        // Held across the spawn so the task cannot deregister before it is
        // registered.
        let mut tasks = self.tasks();
        let handle = tokio::spawn(async move {
            task.await;
            registry.tasks().remove(&id);
        });
        tasks.insert(id, handle.abort_handle());
        id
    }

    /// Abort every registered task. Returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let drained: Vec<AbortHandle> = self.tasks().drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.abort();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn finished_tasks_deregister() {
        let registry = Arc::new(InboundRegistry::new());
        registry.spawn(async {});
        for _ in 0..50 {
            if registry.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task did not deregister");
    }

    #[tokio::test]
    async fn abort_all_stops_running_tasks() {
        let registry = Arc::new(InboundRegistry::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        registry.spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.abort_all(), 1);
        assert!(registry.is_empty());
        // The aborted task drops its sender.
        assert!(rx.await.is_err());
    }
}
