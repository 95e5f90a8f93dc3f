use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SelectedOperation, Sender};

// Every false -> true flip of `flag` puts exactly one token in the channel and
// the token is taken before the flag is cleared, so the channel never holds
// more than one token.
#[derive(Debug)]
pub(crate) struct Interrupt {
    flag: AtomicBool,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Interrupt {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            flag: AtomicBool::new(false),
            tx,
            rx,
        }
    }

    pub(crate) fn raise(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            let _ = self.tx.try_send(());
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a pending interrupt, reporting whether there was one.
    pub(crate) fn take(&self) -> bool {
        if !self.is_set() {
            return false;
        }
        let _ = self.rx.recv();
        self.flag.store(false, Ordering::SeqCst);
        true
    }

    /// Blocks until interrupted or until `timeout` passes. Returns true when
    /// woken by an interrupt, which is consumed.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> bool {
        let woken = match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(()) => true,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
            },
            None => self.rx.recv().is_ok(),
        };
        if woken {
            self.flag.store(false, Ordering::SeqCst);
        }
        woken
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    /// Finishes a select that picked [`Interrupt::receiver`].
    pub(crate) fn complete(&self, oper: SelectedOperation<'_>) {
        let _ = oper.recv(&self.rx);
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_is_idempotent_until_taken() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.take());
        interrupt.raise();
        interrupt.raise();
        assert!(interrupt.is_set());
        assert!(interrupt.take());
        assert!(!interrupt.is_set());
        assert!(!interrupt.take());
    }

    #[test]
    fn pending_interrupt_cuts_wait_short() {
        let interrupt = Interrupt::new();
        interrupt.raise();
        assert!(interrupt.wait(None));
        assert!(!interrupt.is_set());
        assert!(!interrupt.wait(Some(Duration::from_millis(5))));
    }
}
