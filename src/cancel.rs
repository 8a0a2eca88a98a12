//! Cooperative cancellation shared between a caller and the digest engine.
//!
//! A token is triggered at most once. Workers poll [`CancelToken::is_cancelled`]
//! between parts; threads blocked on a channel add [`CancelToken::done`] as an
//! extra arm of `crossbeam_channel::select!`, which becomes ready as soon as
//! the token fires.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    // Never sent on. Dropping it disconnects `done`, waking every receiver.
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
                done: rx,
            }),
        }
    }

    /// Trigger cancellation. Returns true only for the call that fired it.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut trigger = match self.inner.trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        trigger.take();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A receiver that yields `Err(RecvError)` once the token is cancelled and
    /// blocks until then. Nothing is ever sent on it.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{select, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn cancel_fires_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
    }

    #[test]
    fn done_blocks_until_cancelled() {
        let token = CancelToken::new();
        assert_eq!(
            token.done().recv_timeout(Duration::from_millis(20)),
            Err(RecvTimeoutError::Timeout)
        );

        let remote = token.clone();
        let handle = thread::spawn(move || {
            let (_keep, never) = bounded::<()>(0);
            select! {
                recv(never) -> _ => false,
                recv(remote.done()) -> _ => true,
            }
        });
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().unwrap());
    }
}
