//! Capacity-one handoff between the exchange thread and its owner.
//!
//! A push blocks while the slot is occupied and a pull blocks while it
//! is empty, so a pair of slots (one per direction) forces strict
//! request/reply alternation without any other lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, SendTimeoutError};
use metacon_core::{BridgeError, BridgeResult};

pub struct SlotSender<T> {
    inner: channel::Sender<T>,
}

pub struct SlotReceiver<T> {
    inner: channel::Receiver<T>,
}

pub fn slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = channel::bounded(1);
    (SlotSender { inner: tx }, SlotReceiver { inner: rx })
}

impl<T> SlotSender<T> {
    /// Blocks until the slot is free, then deposits `value`.
    pub fn push(&self, value: T) -> BridgeResult<()> {
        self.inner.send(value).map_err(|_| BridgeError::SlotDisconnected)
    }

    /// `push` that re-checks `stop` every `poll`. A free slot wins over
    /// a pending stop. Returns false if stopped before depositing.
    pub fn push_until(&self, value: T, stop: &AtomicBool, poll: Duration) -> BridgeResult<bool> {
        let mut value = value;
        loop {
            match self.inner.send_timeout(value, poll) {
                Ok(()) => return Ok(true),
                Err(SendTimeoutError::Timeout(v)) => value = v,
                Err(SendTimeoutError::Disconnected(_)) => return Err(BridgeError::SlotDisconnected),
            }
            if stop.load(Ordering::SeqCst) {
                return Ok(false);
            }
        }
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }
}

impl<T> SlotReceiver<T> {
    /// Blocks until a value is available and takes it.
    pub fn pull(&self) -> BridgeResult<T> {
        self.inner.recv().map_err(|_| BridgeError::SlotDisconnected)
    }

    pub fn pull_timeout(&self, timeout: Duration) -> BridgeResult<Option<T>> {
        match self.inner.recv_timeout(timeout) {
            Ok(v) => Ok(Some(v)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::SlotDisconnected),
        }
    }

    /// `pull` that re-checks `stop` every `poll`. A waiting value wins
    /// over a pending stop. None if stopped.
    pub fn pull_until(&self, stop: &AtomicBool, poll: Duration) -> BridgeResult<Option<T>> {
        loop {
            if let Some(v) = self.pull_timeout(poll)? {
                return Ok(Some(v));
            }
            if stop.load(Ordering::SeqCst) {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn second_push_waits_for_pull() {
        let (tx, rx) = slot::<u32>();
        tx.push(1).unwrap();
        assert!(tx.is_full());

        let t = thread::spawn(move || {
            let start = Instant::now();
            tx.push(2).unwrap();
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(150));
        assert_eq!(rx.pull().unwrap(), 1);
        let waited = t.join().unwrap();
        assert!(waited >= Duration::from_millis(100), "push returned after {:?}", waited);
        assert_eq!(rx.pull().unwrap(), 2);
    }

    #[test]
    fn pull_until_honors_stop() {
        let (_tx, rx) = slot::<u32>();
        let stop = AtomicBool::new(true);
        assert_eq!(rx.pull_until(&stop, Duration::from_millis(10)).unwrap(), None);
    }

    #[test]
    fn dropped_sender_disconnects() {
        let (tx, rx) = slot::<u32>();
        drop(tx);
        assert!(matches!(rx.pull(), Err(BridgeError::SlotDisconnected)));
    }
}
