//! Terminal sink that logs everything it receives.

use crate::context::{ProcessStatus, ProcessingContext};
use crate::module::Module;

pub struct LogSink {
    name: String,
    received: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: 0,
        }
    }
}

impl Module for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        let Some(msg) = ctx.input() else {
            return ProcessStatus::FailedGetInput;
        };
        self.received += 1;
        tracing::info!(sink = %self.name, received = self.received, "{msg}");
        ProcessStatus::Ok
    }

    fn deinit(&mut self) -> crate::error::Result<()> {
        tracing::info!(sink = %self.name, total = self.received, "log sink done");
        Ok(())
    }
}
