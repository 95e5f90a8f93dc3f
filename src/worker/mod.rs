//! Named OS threads with an observable lifecycle and cooperative interruption.
//!
//! A [`Worker`] is built in [`WorkerState::Created`], becomes
//! [`WorkerState::Running`] as soon as [`Worker::start`] returns and ends in
//! [`WorkerState::Done`]. While it waits in [`sleep`], [`sleep_forever`],
//! [`Worker::join`] or [`Worker::join_timeout`] it reports one of the blocked
//! states.
//!
//! Interruption is only observed at those waits and through [`interrupted`].
//! A worker spinning on pure computation or parked inside a blocking socket
//! call keeps going; std socket I/O cannot be woken by [`Worker::interrupt`].

mod interrupt;
mod state;

pub use self::state::WorkerState;

use std::{
    cell::RefCell,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, Receiver, Select, Sender};
use tracing::{debug, error, info};

use self::interrupt::Interrupt;
use self::state::StateCell;
use crate::{Error, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_WORKER: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static CURRENT: RefCell<Option<Worker>> = const { RefCell::new(None) };
}

/// Handle to a worker thread. Clones refer to the same worker.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    state: StateCell,
    interrupt: Interrupt,
    task: Mutex<Option<Task>>,
    // held by the running thread; joiners wake on the disconnect
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
    panicked: AtomicBool,
}

impl Worker {
    /// Creates a worker named `worker-N`. Nothing runs until [`Worker::start`].
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let id = NEXT_WORKER.fetch_add(1, Ordering::Relaxed);
        Self::with_name(format!("worker-{}", id), body)
    }

    pub fn with_name<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (done_tx, done_rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: StateCell::new(WorkerState::Created),
                interrupt: Interrupt::new(),
                task: Mutex::new(Some(Box::new(body))),
                done_tx: Mutex::new(Some(done_tx)),
                done_rx,
                join_handle: Mutex::new(None),
                panicked: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> WorkerState {
        self.inner.state.load()
    }

    pub fn is_alive(&self) -> bool {
        self.state().is_alive()
    }

    /// Spawns the OS thread. The worker is `Running` once this returns; the
    /// caller never waits for the body.
    pub fn start(&self) -> Result<()> {
        let mut join_handle = lock(&self.inner.join_handle);
        if !self
            .inner
            .state
            .transition(WorkerState::Created, WorkerState::Running)
        {
            return Err(Error::AlreadyStarted(self.inner.name.clone()));
        }
        let task = lock(&self.inner.task).take();
        let done_tx = lock(&self.inner.done_tx).take();
        let worker = self.clone();
        let spawned = thread::Builder::new()
            .name(self.inner.name.clone())
            .spawn(move || worker.run(task, done_tx));
        match spawned {
            Ok(handle) => {
                *join_handle = Some(handle);
                info!(worker = self.name(), "worker started");
                Ok(())
            }
            Err(e) => {
                error!(worker = self.name(), "fail to spawn worker thread");
                self.inner.state.store(WorkerState::Done);
                Err(Error::Io(e))
            }
        }
    }

    fn run(self, task: Option<Task>, done_tx: Option<Sender<()>>) {
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
        if let Some(task) = task {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                self.inner.panicked.store(true, Ordering::SeqCst);
                error!(worker = self.name(), "worker panicked");
            }
        }
        self.inner.state.store(WorkerState::Done);
        debug!(worker = self.name(), "worker done");
        CURRENT.with(|current| current.borrow_mut().take());
        drop(done_tx);
    }

    /// Asks the worker to stop. Has no effect on a worker that is not alive.
    pub fn interrupt(&self) {
        if self.is_alive() {
            debug!(worker = self.name(), "interrupt requested");
            self.inner.interrupt.raise();
        }
    }

    /// Whether an interrupt is pending. Does not clear it.
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupt.is_set()
    }

    /// Blocks until the worker is done. Everything the worker wrote is visible
    /// to the caller afterwards.
    ///
    /// Called from inside another worker, the caller reports
    /// `BlockedIndefinite` meanwhile and an interrupt aborts the wait with
    /// [`Error::Interrupted`]. A worker whose body panicked yields
    /// [`Error::WorkerPanicked`].
    pub fn join(&self) -> Result<()> {
        self.wait_for_done(None).map(|_| ())
    }

    /// Like [`Worker::join`] but gives up after `timeout`, reporting
    /// `BlockedTimed` meanwhile. Returns whether the worker is no longer alive.
    pub fn join_timeout(&self, timeout: Duration) -> Result<bool> {
        self.wait_for_done(Some(timeout))
    }

    fn wait_for_done(&self, timeout: Option<Duration>) -> Result<bool> {
        if self.state() == WorkerState::Created {
            return Ok(true);
        }
        let caller = current();
        let blocked = Blocked::enter(caller.clone(), timeout.is_some());

        let mut sel = Select::new();
        let done = sel.recv(&self.inner.done_rx);
        if let Some(me) = &caller {
            sel.recv(me.inner.interrupt.receiver());
        }
        let oper = match timeout {
            Some(timeout) => match sel.select_timeout(timeout) {
                Ok(oper) => oper,
                Err(_) => return Ok(false),
            },
            None => sel.select(),
        };
        match &caller {
            Some(me) if oper.index() != done => {
                me.inner.interrupt.complete(oper);
                debug!(worker = me.name(), joining = self.name(), "join interrupted");
                return Err(Error::Interrupted);
            }
            _ => {
                let _ = oper.recv(&self.inner.done_rx);
            }
        }
        drop(blocked);
        self.reap().map(|()| true)
    }

    fn reap(&self) -> Result<()> {
        if let Some(handle) = lock(&self.inner.join_handle).take() {
            let _ = handle.join();
        }
        if self.inner.panicked.load(Ordering::SeqCst) {
            return Err(Error::WorkerPanicked(self.inner.name.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

// Puts the calling worker in a blocked state for the guard's lifetime.
struct Blocked(Option<Worker>);

impl Blocked {
    fn enter(worker: Option<Worker>, timed: bool) -> Self {
        if let Some(worker) = &worker {
            worker.inner.state.store(if timed {
                WorkerState::BlockedTimed
            } else {
                WorkerState::BlockedIndefinite
            });
        }
        Self(worker)
    }
}

impl Drop for Blocked {
    fn drop(&mut self) {
        if let Some(worker) = &self.0 {
            worker.inner.state.store(WorkerState::Running);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The worker running on this thread, if any.
pub fn current() -> Option<Worker> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Sleeps for `duration` unless interrupted first, in which case the interrupt
/// is consumed and [`Error::Interrupted`] returned. Outside a worker this is a
/// plain [`thread::sleep`].
pub fn sleep(duration: Duration) -> Result<()> {
    park(Some(duration))
}

/// Sleeps until interrupted. Only returns inside a worker.
pub fn sleep_forever() -> Result<()> {
    park(None)
}

fn park(timeout: Option<Duration>) -> Result<()> {
    match current() {
        Some(worker) => {
            let _blocked = Blocked::enter(Some(worker.clone()), timeout.is_some());
            if worker.inner.interrupt.wait(timeout) {
                debug!(worker = worker.name(), "sleep interrupted");
                Err(Error::Interrupted)
            } else {
                Ok(())
            }
        }
        None => match timeout {
            Some(timeout) => {
                thread::sleep(timeout);
                Ok(())
            }
            None => loop {
                thread::park();
            },
        },
    }
}

/// Polls and clears the current worker's interrupt.
pub fn interrupted() -> bool {
    current().map_or(false, |worker| worker.inner.interrupt.take())
}

/// Polls the current worker's interrupt without clearing it.
pub fn is_interrupted() -> bool {
    current().map_or(false, |worker| worker.is_interrupted())
}
