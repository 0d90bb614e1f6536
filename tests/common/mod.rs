//! Shared helpers for the end-to-end pipeline tests.
#![allow(dead_code)] // each test binary uses a subset

use crossbeam_channel::Receiver;
use flowline::Message;
use std::time::{Duration, Instant};

/// Receives exactly `n` messages from a collect bridge, failing loudly if the
/// pipeline does not deliver them within `timeout`.
pub fn collect_n(rx: &Receiver<Message>, n: usize, timeout: Duration) -> Vec<Message> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::ZERO);
        match rx.recv_timeout(remaining) {
            Ok(msg) => out.push(msg),
            Err(_) => panic!("received {} of {} expected messages", out.len(), n),
        }
    }
    out
}

/// Drains anything that arrives within `window` after the expected traffic.
pub fn drain_extra(rx: &Receiver<Message>, window: Duration) -> usize {
    let mut extra = 0;
    while rx.recv_timeout(window).is_ok() {
        extra += 1;
    }
    extra
}
