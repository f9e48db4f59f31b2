//! Cancellation shared between the frame loop and background
//! subscriptions, similar to Golang's Context.

use std::{
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

/// A cancellable context.
///
/// Clones share a single flag: cancelling any clone cancels them all.
/// The frame loop polls it between frames; the position feed consults it
/// before applying a late geolocation callback.
#[derive(Clone, Debug, Default)]
pub struct Context {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    cancelled: Mutex<bool>,
    cv: Condvar,
}

impl Context {
    /// Create a new, uncancelled Context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the context, waking any waiters.
    pub fn cancel(&self) {
        let mut cancelled = self.shared.cancelled.lock().unwrap();
        *cancelled = true;
        self.shared.cv.notify_all();
    }

    /// Returns true iff the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.shared.cancelled.lock().unwrap()
    }

    /// Wait until the duration expires, or the context is cancelled.
    /// Returns true if the context has been cancelled.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let guard = self.shared.cancelled.lock().unwrap();
        let (guard, _) = self
            .shared
            .cv
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap();
        *guard
    }
}
