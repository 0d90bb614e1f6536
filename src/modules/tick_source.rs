//! A paced counter source, mainly for demos and pipeline smoke tests.

use std::time::Duration;

use crate::config::Config;
use crate::context::{ProcessStatus, ProcessingContext};
use crate::error::Result;
use crate::message::Message;
use crate::module::Module;

/// Emits an incrementing `u64` payload at a fixed interval.
///
/// Config keys:
/// - `intervalMs: int` — pause between ticks (default 100). The runtime does
///   no pacing of its own, so the sleep lives here, inside `process`.
/// - `limit: int` — stop emitting after this many ticks (default unlimited).
pub struct TickSource {
    name: String,
    interval: Duration,
    limit: Option<u64>,
    seq: u64,
}

impl TickSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: Duration::from_millis(100),
            limit: None,
            seq: 0,
        }
    }
}

impl Module for TickSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, config: &Config) -> Result<()> {
        self.interval = Duration::from_millis(config.get_or("intervalMs", 100i64).max(0) as u64);
        let limit = config.get_or("limit", -1i64);
        self.limit = (limit >= 0).then_some(limit as u64);
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        std::thread::sleep(self.interval);
        if self.limit.is_some_and(|limit| self.seq >= limit) {
            return ProcessStatus::Ok;
        }
        ctx.add_output(Message::with_source(self.seq, self.name.clone()));
        self.seq += 1;
        ProcessStatus::Ok
    }
}
