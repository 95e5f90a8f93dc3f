//! Observing OS thread lifecycle, interruption and thread reuse.
//!
//! [`busywork`] burns cpu for a calibrated time, [`Worker`] exposes the
//! lifecycle of one thread, [`InputProbe`] parks a worker in blocking socket
//! I/O and the [`threadpool`] flavours together with [`CompletionService`]
//! show a thread being reused across jobs.

pub mod busywork;
mod completion;
mod error;
pub mod probe;
pub mod threadpool;
pub mod worker;

pub use busywork::{Calibration, Calibrator};
pub use completion::CompletionService;
pub use error::{Error, Result};
pub use probe::InputProbe;
pub use threadpool::{NaiveThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};
pub use worker::{Worker, WorkerState};
