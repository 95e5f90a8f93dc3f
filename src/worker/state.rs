use std::sync::atomic::{AtomicU8, Ordering};

/// Externally observable lifecycle of a [`Worker`](super::Worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Built but not started.
    Created,
    /// Started and not blocked in a join or sleep. A worker blocked in
    /// socket I/O also reports this.
    Running,
    /// Blocked in a join or sleep without a deadline.
    BlockedIndefinite,
    /// Blocked in a join or sleep with a deadline.
    BlockedTimed,
    /// The body returned or panicked.
    Done,
}

impl WorkerState {
    pub fn is_alive(self) -> bool {
        !matches!(self, WorkerState::Created | WorkerState::Done)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::BlockedIndefinite,
            3 => WorkerState::BlockedTimed,
            _ => WorkerState::Done,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Moves to `to` only when currently in `from`.
    pub(crate) fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
