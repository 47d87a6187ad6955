//! Deadline handles polled from the UI tick.
//!
//! Every timer class in the client (reconnect, banner dismiss, debounce,
//! inactivity, fades) owns exactly one `Timer`. Arming replaces the pending
//! deadline, so a class can never have two timers outstanding.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    due: Option<Instant>,
}

impl Timer {
    pub const fn new() -> Self {
        Self { due: None }
    }

    /// Schedule the timer `delay` from `now`, replacing any pending deadline.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.due = Some(now + delay);
    }

    /// Schedule only when nothing is pending. Returns whether it was armed.
    pub fn arm_if_idle(&mut self, now: Instant, delay: Duration) -> bool {
        if self.due.is_some() {
            return false;
        }
        self.arm(now, delay);
        true
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    /// Returns true exactly once when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Streamed text that is flushed once the producer has been quiet for `delay`.
///
/// Each push re-arms the flush, so a burst of chunks collapses into a single
/// flush carrying the whole buffer.
#[derive(Debug, Clone)]
pub struct CoalescingBuffer {
    text: String,
    flush: Timer,
    delay: Duration,
}

impl CoalescingBuffer {
    pub fn new(delay: Duration) -> Self {
        Self {
            text: String::new(),
            flush: Timer::new(),
            delay,
        }
    }

    pub fn push(&mut self, chunk: &str, now: Instant) {
        self.text.push_str(chunk);
        self.flush.arm(now, self.delay);
    }

    /// Returns the full buffer when a flush is due.
    pub fn poll(&mut self, now: Instant) -> Option<&str> {
        if self.flush.fire(now) {
            Some(&self.text)
        } else {
            None
        }
    }

    pub fn cancel_flush(&mut self) {
        self.flush.cancel();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.flush.cancel();
    }

    pub fn contents(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub fn flush_pending(&self) -> bool {
        self.flush.is_pending()
    }
}
