// Crash-safety guard for long history scans.
// Holds the last committed cache state and flushes it when a run is interrupted or fails.

use std::cell::RefCell;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Utc;
use tracing::warn;

use crate::cache::{self, CacheFile};
use crate::error::{Result, StatError};

/// Last fully committed cache state of the current run.
///
/// Clones share the same checkpoint. Runs are single-threaded, so the state lives in
/// an `Rc<RefCell<_>>` that is never borrowed across an await.
#[derive(Debug, Clone)]
pub struct CrashGuard {
    path: PathBuf,
    checkpoint: Rc<RefCell<Option<CacheFile>>>,
}

impl CrashGuard {
    /// Guard the cache file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            checkpoint: Rc::new(RefCell::new(None)),
        }
    }

    /// Record `file` as the latest state in which every record is complete.
    pub fn checkpoint(&self, file: &CacheFile) {
        *self.checkpoint.borrow_mut() = Some(file.clone());
    }

    pub fn snapshot(&self) -> Option<CacheFile> {
        self.checkpoint.borrow().clone()
    }

    /// Write the checkpoint plus a recovery marker.
    pub fn flush(&self) -> Result<()> {
        let snapshot = self.snapshot();
        cache::flush(&self.path, snapshot.as_ref(), Utc::now())
    }

    /// Drive `work` to completion unless Ctrl+C arrives first.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("could not listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run_until(work, interrupt).await
    }

    /// Drive `work` to completion unless `interrupt` resolves first, in which case
    /// the checkpoint is flushed and the run ends with `StatError::Interrupted`.
    pub async fn run_until<F, I, T>(&self, work: F, interrupt: I) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        I: Future<Output = ()>,
    {
        tokio::select! {
            result = work => result,
            () = interrupt => {
                warn!("interrupted, saving committed progress to {}", self.path.display());
                self.flush()?;
                Err(StatError::Interrupted)
            }
        }
    }
}
