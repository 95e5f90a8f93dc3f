use std::{
    panic::{self, AssertUnwindSafe},
    thread,
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::warn;

use crate::{Error, Result, ThreadPool};

/// Submits value-returning jobs to a pool and hands their results back in the
/// order they complete.
pub struct CompletionService<T, P> {
    pool: P,
    done_tx: Sender<Result<T>>,
    done_rx: Receiver<Result<T>>,
}

impl<T, P> CompletionService<T, P>
where
    T: Send + 'static,
    P: ThreadPool,
{
    pub fn new(pool: P) -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            pool,
            done_tx,
            done_rx,
        }
    }

    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let done_tx = self.done_tx.clone();
        self.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|_| {
                let name = thread::current().name().unwrap_or("unnamed").to_owned();
                warn!(thread = name.as_str(), "submitted job panicked");
                Error::WorkerPanicked(name)
            });
            let _ = done_tx.send(outcome);
        });
    }

    /// Blocks until the next job completes.
    pub fn take(&self) -> Result<T> {
        self.done_rx.recv().map_err(|_| Error::PoolShutDown)?
    }

    /// Like [`CompletionService::take`] but returns `None` if nothing completes
    /// within `timeout`.
    pub fn poll(&self, timeout: Duration) -> Option<Result<T>> {
        match self.done_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Error::PoolShutDown)),
        }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Gives the pool back. Results not taken yet are dropped.
    pub fn into_pool(self) -> P {
        self.pool
    }
}
