use std::sync::atomic::{AtomicUsize, Ordering};

use crate::Result;

/// Runs jobs on threads it owns.
pub trait ThreadPool: Send {
    /// Rejects `threads == 0` with [`Error::InvalidPoolSize`](crate::Error::InvalidPoolSize).
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + 'static + Send;
}

mod naive;
pub use naive::NaiveThreadPool;

mod shared;
pub use shared::SharedQueueThreadPool;

mod rayon;
pub use self::rayon::RayonThreadPool;

static NEXT_POOL: AtomicUsize = AtomicUsize::new(1);

// pools are numbered from 1 across the process
fn next_pool_id() -> usize {
    NEXT_POOL.fetch_add(1, Ordering::Relaxed)
}

/// `pool-{pool}-thread-{index}`, with `index` counted from 1.
pub fn thread_name(pool: usize, index: usize) -> String {
    format!("pool-{}-thread-{}", pool, index)
}
