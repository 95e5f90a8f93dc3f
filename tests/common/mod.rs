#![allow(dead_code)]

use std::{
    thread,
    time::{Duration, Instant},
};

/// Generous upper bound for things that should happen "promptly".
pub const PROMPTLY: Duration = Duration::from_millis(500);

pub const PATIENCE: Duration = Duration::from_secs(10);

/// Polls `cond` until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
