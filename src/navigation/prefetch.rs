//! Bounded background pool for thumbnail prefetch.
//!
//! Tasks are spawned immediately and wait for a semaphore permit before
//! running, so submitting never blocks the caller and at most `size` tasks
//! run at once. Tasks report through channels owned by the caller; when the
//! receiver is gone the results are dropped on the floor.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::resolver::Thumbnail;

/// Minimum allowed pool size.
const MIN_POOL_SIZE: usize = 1;

/// Maximum allowed pool size.
const MAX_POOL_SIZE: usize = 100;

/// Default number of concurrent prefetch tasks.
pub const DEFAULT_POOL_SIZE: usize = 20;

/// Error type for pool construction.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Invalid pool size provided.
    #[error("invalid pool size {value}: must be between {MIN_POOL_SIZE} and {MAX_POOL_SIZE}")]
    InvalidSize {
        /// The rejected value.
        value: usize,
    },
}

/// Which thumbnail strip an update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// "More from author".
    Author,
    /// "More from gallery".
    Gallery,
    /// A gallery listing page.
    Listing {
        /// Listing page number.
        page: u64,
    },
}

/// A thumbnail that finished loading in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelUpdate {
    /// Target strip.
    pub panel: Panel,
    /// Zero-based slot within the strip.
    pub slot: usize,
    /// Loaded thumbnail.
    pub thumbnail: Thumbnail,
}

/// Semaphore-bounded task pool.
#[derive(Debug, Clone)]
pub struct PrefetchPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl PrefetchPool {
    /// Creates a pool running at most `size` tasks at once.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidSize`] if `size` is outside 1..=100.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if !(MIN_POOL_SIZE..=MAX_POOL_SIZE).contains(&size) {
            return Err(PoolError::InvalidSize { value: size });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    /// Configured concurrency bound.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by running tasks.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawns `task`; it starts once a permit is free.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            // Permit is dropped when this block exits (RAII)
            let Ok(_permit) = semaphore.acquire_owned().await else {
                warn!("prefetch pool closed; task dropped");
                return;
            };
            task.await;
        })
    }
}

/// Waits for `handles`, logging tasks that panicked.
pub async fn join_all(handles: Vec<JoinHandle<()>>) {
    debug!(task_count = handles.len(), "waiting for prefetch tasks");
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "prefetch task panicked");
        }
    }
}
