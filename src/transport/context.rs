//! Transport context
//!
//! Owns the background I/O threads of every session created from it.
//! One context is normally created at process start and handed to each
//! session constructor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;

/// Handle to the shared transport runtime
///
/// Cloning is cheap; all clones refer to the same runtime. Dropping the
/// last clone terminates it.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    shared: Arc<Shared>,
}

/// State visible to the I/O threads
pub(crate) struct Shared {
    terminated: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    max_frame_size: usize,
}

impl Context {
    /// Create a context with default settings
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Create a context using the transport settings in `config`
    pub fn with_config(config: &Config) -> Self {
        let shared = Arc::new(Shared {
            terminated: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            max_frame_size: config.max_frame_size,
        });

        Self {
            inner: Arc::new(ContextInner { shared }),
        }
    }

    /// True once `terminate` has been called
    pub fn is_terminated(&self) -> bool {
        self.inner.shared.is_terminated()
    }

    /// Stop every session's I/O threads and wait for them to exit
    pub fn terminate(&self) {
        self.inner.shared.terminate();
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.inner.shared)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.shared.terminate();
    }
}

impl Shared {
    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub(crate) fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Spawn a named I/O thread tracked by this context
    ///
    /// Handles of threads that already exited are released here, so the
    /// list only holds live workers plus those finished since the last spawn.
    pub(crate) fn spawn<F>(&self, name: String, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name).spawn(f)?;
        let mut workers = self.workers.lock();
        workers.retain(|worker| !worker.is_finished());
        workers.push(handle);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_workers(&self) -> usize {
        self.workers.lock().len()
    }

    fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("Terminating transport context");

        // Joined threads may have registered more workers before exiting
        loop {
            let handles = std::mem::take(&mut *self.workers.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if handle.join().is_err() {
                    tracing::warn!("Transport thread panicked");
                }
            }
        }
    }
}
