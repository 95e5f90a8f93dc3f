use std::{
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    time::Duration,
};

use tracing::{debug, info};

use crate::{worker, Result};

/// How long [`InputProbe::serve_until_interrupted`] sleeps between accepts.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A loopback listener used to park a worker in blocking socket I/O.
pub struct InputProbe {
    addr: SocketAddr,
    listener: TcpListener,
}

impl InputProbe {
    /// Binds `127.0.0.1` on an ephemeral port.
    pub fn bind() -> Result<Self> {
        Self::bind_to(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    pub fn bind_to(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        debug!(addr = format!("{:?}", addr).as_str(), "probe listening");
        Ok(Self { addr, listener })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Blocks in `accept` and then in `read` for a single byte. `None` means
    /// the peer closed without sending anything.
    ///
    /// [`Worker::interrupt`](crate::Worker::interrupt) does not wake this.
    pub fn receive_one(&self) -> Result<Option<u8>> {
        let (stream, peer) = self.listener.accept()?;
        info!(peer = format!("{:?}", peer).as_str(), "probe accepted");
        read_byte(stream)
    }

    /// Accepts connections without blocking, hands the first byte of each to
    /// `handler` and polls for interruption between accepts. Returns the
    /// number of connections handled once the current worker is interrupted.
    ///
    /// Outside a worker nothing can interrupt the loop.
    pub fn serve_until_interrupted<F>(&self, mut handler: F) -> Result<usize>
    where
        F: FnMut(Option<u8>),
    {
        self.listener.set_nonblocking(true)?;
        let mut served = 0;
        while !worker::is_interrupted() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!(peer = format!("{:?}", peer).as_str(), "probe accepted");
                    stream.set_nonblocking(false)?;
                    handler(read_byte(stream)?);
                    served += 1;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if worker::sleep(ACCEPT_POLL_INTERVAL).is_err() {
                        break;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(served, "probe stops listening");
        self.listener.set_nonblocking(false)?;
        Ok(served)
    }
}

fn read_byte(mut stream: TcpStream) -> Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match stream.read(&mut buf)? {
        0 => Ok(None),
        _ => Ok(Some(buf[0])),
    }
}

/// Connects to `addr`, writes `byte` and hangs up.
pub fn send_byte(addr: SocketAddr, byte: u8) -> Result<()> {
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(&[byte])?;
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use super::*;
    use crate::Worker;

    #[test]
    fn binds_an_ephemeral_loopback_port() {
        let probe = InputProbe::bind().unwrap();
        assert!(probe.local_addr().ip().is_loopback());
        assert_ne!(probe.local_addr().port(), 0);
    }

    #[test]
    fn receives_one_byte() {
        let probe = InputProbe::bind().unwrap();
        let addr = probe.local_addr();
        let received = Arc::new(Mutex::new(None));
        let seen = received.clone();
        let worker = Worker::new(move || {
            *seen.lock().unwrap() = Some(probe.receive_one().unwrap());
        });
        worker.start().unwrap();
        send_byte(addr, 42).unwrap();
        worker.join().unwrap();
        assert_eq!(*received.lock().unwrap(), Some(Some(42)));
    }

    #[test]
    fn empty_connection_reads_nothing() {
        let probe = InputProbe::bind().unwrap();
        let addr = probe.local_addr();
        let worker = Worker::new(move || {
            assert_eq!(probe.receive_one().unwrap(), None);
        });
        worker.start().unwrap();
        drop(TcpStream::connect(addr).unwrap());
        worker.join().unwrap();
    }

    #[test]
    fn polling_listener_serves_until_interrupted() {
        let probe = InputProbe::bind().unwrap();
        let addr = probe.local_addr();
        let bytes = Arc::new(Mutex::new(vec![]));
        let served = Arc::new(AtomicUsize::new(0));
        let (seen_bytes, seen_served) = (bytes.clone(), served.clone());
        let (ready_tx, ready_rx) = crossbeam_channel::unbounded();
        let worker = Worker::new(move || {
            let count = probe
                .serve_until_interrupted(|byte| {
                    seen_bytes.lock().unwrap().push(byte);
                    let _ = ready_tx.send(());
                })
                .unwrap();
            seen_served.store(count, Ordering::SeqCst);
        });
        worker.start().unwrap();
        send_byte(addr, 1).unwrap();
        send_byte(addr, 2).unwrap();
        ready_rx.recv().unwrap();
        ready_rx.recv().unwrap();
        worker.interrupt();
        assert!(worker.join_timeout(Duration::from_secs(5)).unwrap());
        assert_eq!(*bytes.lock().unwrap(), [Some(1), Some(2)]);
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }
}
