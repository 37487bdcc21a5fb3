//! Process-wide ASR singleton (spec.md §4.5/§5): initialized once under
//! a one-time latch, then read-only. `initialized` is tracked
//! separately from the provider reference so a failed first
//! initialization can be retried by a later call without that call
//! recursing into itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use super::{AsrBackend, AsrError};

pub struct AsrSingleton {
    initialized: AtomicBool,
    backend: Mutex<Option<Arc<dyn AsrBackend>>>,
}

impl Default for AsrSingleton {
    fn default() -> Self {
        Self::new()
    }
}

impl AsrSingleton {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            backend: Mutex::new(None),
        }
    }

    /// Returns the existing backend, or runs `init` once to create it.
    /// Concurrent callers serialize on the mutex rather than racing to
    /// construct the (expensive) backend twice.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<Arc<dyn AsrBackend>, AsrError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Arc<dyn AsrBackend>, AsrError>>,
    {
        let mut guard = self.backend.lock().await;
        if let Some(backend) = guard.as_ref() {
            return Ok(backend.clone());
        }

        let backend = init().await?;
        *guard = Some(backend.clone());
        self.initialized.store(true, Ordering::Release);
        Ok(backend)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}
