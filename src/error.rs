use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not find a prime big enough to keep the cpu busy for {millis} ms")]
    CalibrationExhausted { millis: u128 },

    #[error("interrupted")]
    Interrupted,

    #[error("worker {0} was already started")]
    AlreadyStarted(String),

    #[error("worker {0} panicked")]
    WorkerPanicked(String),

    #[error("invalid pool size {0}")]
    InvalidPoolSize(u32),

    #[error("fail to build rayon pool")]
    Rayon(#[from] rayon::ThreadPoolBuildError),

    #[error("thread pool is shut down")]
    PoolShutDown,

    #[error("io failure")]
    Io(#[from] std::io::Error),

    #[error("fail to serialize report {0}")]
    Report(#[from] serde_json::Error),
}
