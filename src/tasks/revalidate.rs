//! Bounded pool for detached background refreshes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Caps the number of in-flight background refreshes.
///
/// When every permit is taken, new work is refused instead of queued so a
/// burst of cache hits cannot fan out into unbounded upstream traffic.
#[derive(Debug, Clone)]
pub struct RevalidatePool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl RevalidatePool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Spawns `task` if a slot is free. Returns false when the pool is full.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                tokio::spawn(async move {
                    task.await;
                    drop(permit);
                });
                true
            }
            Err(_) => false,
        }
    }

    /// Number of refreshes currently running.
    pub fn in_flight(&self) -> usize {
        self.size - self.permits.available_permits()
    }
}
