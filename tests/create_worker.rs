use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_channel::bounded;

use threadlab::{busywork, Worker, WorkerState};

mod common;
use common::{eventually, PATIENCE};

// A cpu-bound child that keeps going until `release` is set.
fn busy_child(release: &Arc<AtomicBool>) -> Worker {
    let release = release.clone();
    Worker::new(move || {
        while !release.load(Ordering::SeqCst) {
            busywork::run_until(1_000);
        }
    })
}

#[test]
fn test_create_worker() {
    let changed = Arc::new(AtomicBool::new(false));
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let flag = changed.clone();
    let worker = Worker::new(move || {
        let _ = gate_rx.recv();
        let _ = flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst);
    });

    // Before starting, nothing runs.
    assert!(!worker.is_alive());
    assert_eq!(worker.state(), WorkerState::Created);
    assert!(!changed.load(Ordering::SeqCst));

    // Start does not wait for the body.
    worker.start().unwrap();
    assert!(worker.is_alive());
    assert_eq!(worker.state(), WorkerState::Running);
    assert!(!changed.load(Ordering::SeqCst));

    gate_tx.send(()).unwrap();
    worker.join().unwrap();
    assert!(!worker.is_alive());
    assert_eq!(worker.state(), WorkerState::Done);
    assert!(changed.load(Ordering::SeqCst));
}

#[test]
fn test_worker_in_indefinite_wait() {
    let release = Arc::new(AtomicBool::new(false));
    let child = busy_child(&release);
    let spawned = child.clone();
    let parent = Worker::new(move || {
        spawned.start().unwrap();
        spawned.join().unwrap();
    });
    parent.start().unwrap();

    assert!(!parent.join_timeout(Duration::from_millis(100)).unwrap());
    assert!(eventually(PATIENCE, || {
        parent.state() == WorkerState::BlockedIndefinite
    }));
    assert_eq!(child.state(), WorkerState::Running);

    release.store(true, Ordering::SeqCst);
    // joining the parent covers the whole chain
    parent.join().unwrap();
    assert_eq!(child.state(), WorkerState::Done);
    assert_eq!(parent.state(), WorkerState::Done);
}

#[test]
fn test_worker_in_timed_wait() {
    let release = Arc::new(AtomicBool::new(false));
    let child = busy_child(&release);
    let spawned = child.clone();
    let parent = Worker::new(move || {
        spawned.start().unwrap();
        let _ = spawned.join_timeout(Duration::from_secs(30));
    });
    parent.start().unwrap();

    assert!(!parent.join_timeout(Duration::from_millis(100)).unwrap());
    assert!(eventually(PATIENCE, || {
        parent.state() == WorkerState::BlockedTimed
    }));

    release.store(true, Ordering::SeqCst);
    parent.join().unwrap();
    assert!(!child.is_alive());
}

#[test]
fn test_timed_join_gives_up_and_resumes() {
    let release = Arc::new(AtomicBool::new(false));
    let child = busy_child(&release);
    let spawned = child.clone();
    let (tx, rx) = bounded(1);
    let parent = Worker::new(move || {
        spawned.start().unwrap();
        tx.send(spawned.join_timeout(Duration::from_millis(20)).unwrap())
            .unwrap();
    });
    parent.start().unwrap();
    parent.join().unwrap();

    assert!(!rx.recv().unwrap());
    assert!(child.is_alive());
    release.store(true, Ordering::SeqCst);
    child.join().unwrap();
}

#[test]
fn test_child_worker_is_independent_from_parent() {
    let release = Arc::new(AtomicBool::new(false));
    let calculation_is_done = Arc::new(AtomicBool::new(false));
    let child = {
        let release = release.clone();
        let done = calculation_is_done.clone();
        Worker::new(move || {
            while !release.load(Ordering::SeqCst) {
                busywork::run_until(1_000);
            }
            busywork::run_until(1_000);
            done.store(true, Ordering::SeqCst);
        })
    };
    let spawned = child.clone();
    let parent = Worker::new(move || spawned.start().unwrap());
    parent.start().unwrap();

    assert!(parent.join_timeout(PATIENCE).unwrap());
    assert!(!parent.is_alive());
    assert!(child.is_alive());
    assert!(!calculation_is_done.load(Ordering::SeqCst));

    release.store(true, Ordering::SeqCst);
    assert!(child.join_timeout(PATIENCE).unwrap());
    assert!(calculation_is_done.load(Ordering::SeqCst));
}
