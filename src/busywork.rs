//! A controllable CPU sink.
//!
//! The prime search here is naive trial division on purpose: its cost is the
//! product. Nothing in this module sleeps, so a worker running it can only be
//! stopped if it polls for interruption itself.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::{Error, Result};

/// Bound that kept the cpu busy for ~100ms on the reference machine.
pub const BOUND_100MS: u64 = 15121;

/// Bound that kept the cpu busy for ~1s on the reference machine.
pub const BOUND_1S: u64 = 52021;

/// Busy for roughly 100ms on the reference machine.
pub fn run_100ms() {
    run_until(BOUND_100MS);
}

/// Busy for roughly one second on the reference machine.
pub fn run_1s() {
    run_until(BOUND_1S);
}

/// Walks the primes from 1 until the running value reaches `bound`.
pub fn run_until(bound: u64) {
    let mut current = 1;
    while current < bound {
        match next_prime(current) {
            Some(prime) => current = prime,
            None => return,
        }
    }
}

/// Smallest prime strictly greater than `previous`, or `None` if it does not
/// fit in a `u64`.
pub fn next_prime(previous: u64) -> Option<u64> {
    let mut candidate = previous.checked_add(1)?;
    loop {
        let mut divisor = 2;
        while divisor < candidate {
            if candidate % divisor == 0 {
                break;
            }
            divisor += 1;
        }
        if divisor == candidate {
            return Some(candidate);
        }
        candidate = candidate.checked_add(1)?;
    }
}

/// See [`Calibrator::calibrate`]. Starts the search at 1.
pub fn find_largest_prime_below_bound_for(duration: Duration) -> Result<u64> {
    Calibrator::default()
        .calibrate(duration)
        .map(|calibration| calibration.bound)
}

/// Finds prime search bounds by wall clock.
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    start: u64,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self { start: 1 }
    }
}

impl Calibrator {
    /// Search from `start` instead of 1.
    pub fn starting_at(start: u64) -> Self {
        Self { start }
    }

    /// Keeps finding the next prime until more than `duration` has elapsed and
    /// returns the last prime found.
    pub fn calibrate(&self, duration: Duration) -> Result<Calibration> {
        let mut current = self.start;
        let begin = Instant::now();
        while current < u64::MAX {
            current = match next_prime(current) {
                Some(prime) => prime,
                None => break,
            };
            let elapsed = begin.elapsed();
            if elapsed > duration {
                debug!(
                    bound = current,
                    requested_ms = duration.as_millis() as u64,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "calibrated"
                );
                return Ok(Calibration {
                    bound: current,
                    requested: duration,
                    measured: elapsed,
                });
            }
        }
        Err(Error::CalibrationExhausted {
            millis: duration.as_millis(),
        })
    }
}

/// A bound found on this machine together with the time it took to find it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Calibration {
    pub bound: u64,
    #[serde(serialize_with = "as_millis")]
    pub requested: Duration,
    #[serde(serialize_with = "as_millis")]
    pub measured: Duration,
}

impl Calibration {
    /// Recalibrates the ~100ms and ~1s bounds for the current machine.
    pub fn measure() -> Result<(Calibration, Calibration)> {
        let calibrator = Calibrator::default();
        let short = calibrator.calibrate(Duration::from_millis(100))?;
        let long = calibrator.calibrate(Duration::from_secs(1))?;
        Ok((short, long))
    }

    /// Replays the calibrated workload.
    pub fn run(&self) {
        run_until(self.bound);
    }
}

fn as_millis<S>(duration: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u64(duration.as_millis() as u64)
}
