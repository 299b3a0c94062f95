use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ViewerError;

/// Runs windowing or statistics jobs on tokio's blocking pool, keeping only
/// the newest result.
///
/// Every submission takes a fresh generation number. When a job finishes, its
/// result is delivered only if nothing was submitted (or invalidated) in the
/// meantime; otherwise it resolves to `Ok(None)`. Results are whole values,
/// so a host applies either all of one or none of it.
#[derive(Debug, Clone, Default)]
pub struct BackgroundWorker {
    latest: Arc<AtomicU64>,
}

impl BackgroundWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recent submission or invalidation.
    pub fn generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Mark every outstanding job as stale, e.g. after the slice changed.
    pub fn invalidate(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Start `job` immediately and return a future for its result.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<T, F>(
        &self,
        job: F,
    ) -> impl Future<Output = Result<Option<T>, ViewerError>> + Send + use<T, F>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let generation = self.invalidate();
        let latest = Arc::clone(&self.latest);
        let handle = tokio::task::spawn_blocking(job);

        async move {
            let value = handle.await?;
            if latest.load(Ordering::Acquire) != generation {
                log::debug!("discarding stale result of generation {generation}");
                return Ok(None);
            }
            Ok(Some(value))
        }
    }
}
