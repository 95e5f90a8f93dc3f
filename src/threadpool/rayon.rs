use tracing::error;

use super::{next_pool_id, thread_name, ThreadPool};
use crate::{Error, Result};

pub struct RayonThreadPool {
    inner: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        if threads == 0 {
            return Err(Error::InvalidPoolSize(threads));
        }
        let pool_id = next_pool_id();
        Ok(Self {
            inner: rayon::ThreadPoolBuilder::new()
                .num_threads(threads as usize)
                .thread_name(move |index| thread_name(pool_id, index + 1))
                .panic_handler(move |_| error!(pool = pool_id, "job panicked on rayon pool"))
                .build()?,
        })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + 'static + Send,
    {
        self.inner.spawn(job);
    }
}
