//! Forwards every input unchanged, re-tagged with this module's name.

use crate::context::{ProcessStatus, ProcessingContext};
use crate::message::Message;
use crate::module::Module;

/// Identity transformer.
///
/// The message id is preserved so downstream fusion stages can still match
/// siblings descending from the same ancestor; only the source tag is
/// re-stamped to this module's name, which is what fan-in stages key their
/// tuples on.
pub struct PassThrough {
    name: String,
}

impl PassThrough {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Module for PassThrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        let Ok(mut msg) = ctx.take_input() else {
            return ProcessStatus::FailedGetInput;
        };
        msg.meta_mut().source_name = self.name.clone();
        ctx.add_output(msg);
        ProcessStatus::Ok
    }
}
