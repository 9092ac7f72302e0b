//! Keep-alive tracker for one streaming client.
//!
//! The simulator sends a `~h~<n>` heartbeat at a fixed interval and expects the
//! client to echo it back. Only one heartbeat is outstanding at a time; the next
//! one is not sent until the previous one was answered. A client that leaves a
//! heartbeat unanswered for longer than the timeout is considered gone.
//!
//! All operations take the current `Instant` explicitly so the caller controls
//! time, which keeps the tracker deterministic under test.

use std::time::{Duration, Instant};

use price_common::frame;

/// Tracks the outstanding heartbeat of a client.
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    counter: u64,
    last_sent: Instant,
    outstanding: Option<(String, Instant)>,
}

impl HeartbeatMonitor {
    /// Create a monitor; the first heartbeat is due one `interval` after `now`.
    pub fn new(interval: Duration, timeout: Duration, now: Instant) -> Self {
        Self {
            interval,
            timeout,
            counter: 0,
            last_sent: now,
            outstanding: None,
        }
    }

    /// Returns `true` if a new heartbeat should be sent.
    pub fn is_due(&self, now: Instant) -> bool {
        self.outstanding.is_none() && now.duration_since(self.last_sent) >= self.interval
    }

    /// Record a heartbeat sent at `now` and return its payload.
    pub fn next(&mut self, now: Instant) -> String {
        self.counter += 1;
        let payload = frame::heartbeat(self.counter);
        self.last_sent = now;
        self.outstanding = Some((payload.clone(), now));
        payload
    }

    /// Mark the outstanding heartbeat as answered if `payload` echoes it.
    pub fn acknowledge(&mut self, payload: &str) -> bool {
        match &self.outstanding {
            Some((expected, _)) if expected == payload => {
                self.outstanding = None;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if the outstanding heartbeat went unanswered too long.
    pub fn is_timed_out(&self, now: Instant) -> bool {
        self.outstanding
            .as_ref()
            .is_some_and(|(_, sent)| now.duration_since(*sent) > self.timeout)
    }
}
