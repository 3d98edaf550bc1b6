//! Per-model task runner with failure isolation.
//!
//! Every registry entry is independent, so stages fan out over rayon's
//! pool and collect results back in registry order. A panicking backend is
//! caught and reported; with a timeout configured, each call runs on its own
//! thread and is abandoned once the limit passes.

use crate::error::{PipelineError, Result};
use crate::models::ModelHandle;
use crate::registry::{ModelId, RegistryEntry};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Runs one task per registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    parallel: bool,
    timeout: Option<Duration>,
}

impl Executor {
    /// Run entries one after another on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            timeout: None,
        }
    }

    /// Run entries on the rayon thread pool.
    pub fn parallel() -> Self {
        Self {
            parallel: true,
            timeout: None,
        }
    }

    /// Abandon any single model call that takes longer than `timeout`.
    ///
    /// An abandoned call keeps its thread until the backend returns; its
    /// result is discarded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Apply `task` to the handle of every entry, returning results keyed by
    /// model id in entry order.
    pub fn run<T, F>(&self, entries: &[RegistryEntry], task: F) -> Vec<(ModelId, Result<T>)>
    where
        T: Send + 'static,
        F: Fn(&ModelHandle) -> Result<T> + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let run_one = |entry: &RegistryEntry| (entry.id(), self.run_one(entry, &task));

        if self.parallel {
            entries.par_iter().map(run_one).collect()
        } else {
            entries.iter().map(run_one).collect()
        }
    }

    fn run_one<T, F>(&self, entry: &RegistryEntry, task: &Arc<F>) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(&ModelHandle) -> Result<T> + Send + Sync + 'static,
    {
        let limit = match self.timeout {
            None => return catch(|| task(entry.handle())),
            Some(limit) => limit,
        };

        let (tx, rx) = bounded(1);
        let task = Arc::clone(task);
        let handle = entry.handle().clone();
        thread::Builder::new()
            .name(format!("model-{}", entry.id()))
            .spawn(move || {
                // the receiver is gone if the call already timed out
                let _ = tx.send(catch(|| task(&handle)));
            })
            .map_err(|e| {
                PipelineError::ComputationError(format!("could not spawn model thread: {}", e))
            })?;

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let limit_ms = limit.as_millis() as u64;
                warn!(model_id = %entry.id(), label = entry.label(), limit_ms, "model call timed out");
                Err(PipelineError::Timeout { limit_ms })
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::BackendPanicked(
                "model thread exited without a result".to_string(),
            )),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::parallel()
    }
}

fn catch<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(PipelineError::BackendPanicked(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
