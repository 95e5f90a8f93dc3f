use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use tracing::error;

use super::{next_pool_id, thread_name, ThreadPool};
use crate::{Error, Result};

/// Spawns a fresh thread for every job; nothing is reused.
pub struct NaiveThreadPool {
    pool_id: usize,
    spawned: AtomicUsize,
}

impl ThreadPool for NaiveThreadPool {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + 'static + Send,
    {
        let index = self.spawned.fetch_add(1, Ordering::Relaxed) + 1;
        let name = thread_name(self.pool_id, index);
        if let Err(e) = thread::Builder::new().name(name.clone()).spawn(job) {
            error!(thread = name.as_str(), error = %e, "fail to spawn job thread");
        }
    }

    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        if threads == 0 {
            return Err(Error::InvalidPoolSize(threads));
        }
        Ok(NaiveThreadPool {
            pool_id: next_pool_id(),
            spawned: AtomicUsize::new(0),
        })
    }
}
