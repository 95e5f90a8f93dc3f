use std::{sync::Arc, thread};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, warn};

use super::{next_pool_id, thread_name, ThreadPool};
use crate::{Error, Result};

type Job = Box<dyn Send + 'static + FnOnce()>;
enum Message {
    Task(Job),
    Stop,
}

/// Fixed set of named threads draining one shared queue in FIFO order.
pub struct SharedQueueThreadPool {
    msg_send_queue: Sender<Message>,
    threads: u32,
}

pub struct ThreadPoolSharedData {
    pool_id: usize,
    msg_queue: Receiver<Message>,
}

impl ThreadPoolSharedData {
    fn new(pool_id: usize, msg_queue: Receiver<Message>) -> Self {
        Self { pool_id, msg_queue }
    }
}

impl Drop for SharedQueueThreadPool {
    fn drop(&mut self) {
        for _ in 0..self.threads {
            if self.msg_send_queue.send(Message::Stop).is_err() {
                warn!("all pool threads are gone before shutdown");
                break;
            }
        }
    }
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        if threads == 0 {
            return Err(Error::InvalidPoolSize(threads));
        }
        let (tx, rx) = unbounded();
        let shared_data = Arc::new(ThreadPoolSharedData::new(next_pool_id(), rx));
        for index in 1..=threads as usize {
            spawn_thread(shared_data.clone(), index)?;
        }
        debug!(pool = shared_data.pool_id, threads, "shared queue pool ready");
        Ok(Self {
            msg_send_queue: tx,
            threads,
        })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + 'static + Send,
    {
        if self
            .msg_send_queue
            .send(Message::Task(Box::new(job)))
            .is_err()
        {
            error!("fail to send job, no pool thread left");
        }
    }
}

struct Sentinel {
    shared_data: Arc<ThreadPoolSharedData>,
    index: usize,
    active: bool,
}

impl Sentinel {
    fn new(shared_data: Arc<ThreadPoolSharedData>, index: usize) -> Self {
        Self {
            shared_data,
            index,
            active: true,
        }
    }

    fn cancel(&mut self) {
        self.active = false;
    }
}

impl Drop for Sentinel {
    fn drop(&mut self) {
        if self.active && thread::panicking() {
            warn!(
                thread = thread_name(self.shared_data.pool_id, self.index).as_str(),
                "job panicked, replacing pool thread"
            );
            if let Err(e) = spawn_thread(self.shared_data.clone(), self.index) {
                error!(error = %e, "fail to replace pool thread");
            }
        }
    }
}

// spawn one thread
// used in either threadpool creation
// or after a thread panicked; the replacement keeps the name
fn spawn_thread(shared_data: Arc<ThreadPoolSharedData>, index: usize) -> Result<()> {
    let name = thread_name(shared_data.pool_id, index);
    thread::Builder::new().name(name).spawn(move || {
        let mut sentinel = Sentinel::new(shared_data.clone(), index);
        while let Ok(msg) = shared_data.msg_queue.recv() {
            match msg {
                Message::Task(job) => job(),
                Message::Stop => break,
            }
        }
        sentinel.cancel();
    })?;
    Ok(())
}
