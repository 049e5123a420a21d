//! Cooperative cancellation.
//!
//! The CLI's interrupt handler flips a [`CancelToken`]; transfers poll it
//! between chunks and before each request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Poll interval used by [`CancelToken::sleep`].
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// The run was interrupted by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted by user")]
pub struct Cancelled;

/// Shared flag signalling that the run should stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `false` if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    /// Block on `rx` until a message arrives, waking early on cancellation.
    ///
    /// Returns `Ok(None)` once every sender is gone.
    pub fn recv<T>(&self, rx: &Receiver<T>) -> Result<Option<T>, Cancelled> {
        loop {
            if self.is_cancelled() {
                return Err(Cancelled);
            }
            match rx.recv_timeout(SLEEP_SLICE) {
                Ok(value) => return Ok(Some(value)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_sleep_returns_early_when_cancelled() {
        let token = CancelToken::new();
        let clone = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            clone.cancel();
        });
        let started = Instant::now();
        assert!(!token.sleep(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_recv_returns_message() {
        let token = CancelToken::new();
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(7).unwrap();
        assert_eq!(token.recv(&rx), Ok(Some(7)));
        drop(tx);
        assert_eq!(token.recv(&rx), Ok(None));
    }

    #[test]
    fn test_recv_wakes_on_cancel_while_sender_is_silent() {
        let token = CancelToken::new();
        let clone = token.clone();
        let (_tx, rx) = std::sync::mpsc::channel::<u8>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            clone.cancel();
        });
        let started = Instant::now();
        assert_eq!(token.recv(&rx), Err(Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
