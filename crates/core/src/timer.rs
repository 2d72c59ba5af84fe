//! Scoped timer ownership
//!
//! A [`TimerGuard`] holds the cancel handle of a running timer. Dropping the
//! guard cancels the timer, so a timer can never outlive the value that owns
//! its guard. The core stays runtime-agnostic: whoever starts the timer hands
//! in the cancel closure (e.g. aborting a tokio task).

use std::fmt;

pub struct TimerGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerGuard {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard that owns nothing
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Cancel now instead of at drop
    pub fn cancel(mut self) {
        self.fire();
    }

    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_guard() -> (TimerGuard, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        let guard = TimerGuard::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        (guard, count)
    }

    #[test]
    fn drop_cancels_once() {
        let (guard, count) = counting_guard();
        drop(guard);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_cancel_does_not_fire_twice() {
        let (guard, count) = counting_guard();
        guard.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replacing_an_option_cancels_previous() {
        let (first, count) = counting_guard();
        let mut slot = Some(first);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(slot.as_ref().is_some_and(TimerGuard::is_armed));
        slot = None;
        assert!(slot.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!TimerGuard::inert().is_armed());
    }
}
