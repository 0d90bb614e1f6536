//! Host-bridge modules: feed a running pipeline from the host thread and tap
//! its output, using crossbeam channels as the thread boundary.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::time::Duration;

use crate::context::{ProcessStatus, ProcessingContext};
use crate::message::Message;
use crate::module::Module;

/// How long an idle [`InjectSource`] blocks on its host channel per
/// invocation. Short enough to keep stop latency bounded.
const RECV_TIMEOUT: Duration = Duration::from_millis(10);

/// A source fed by the host through a crossbeam sender.
///
/// Messages are forwarded as-is; the host controls ids, payloads and pacing.
/// Construction hands back the sender half:
///
/// ```
/// # use flowline::modules::InjectSource;
/// # use flowline::Message;
/// let (source, feed) = InjectSource::new("input");
/// feed.send(Message::with_source(1u64, "input")).unwrap();
/// ```
pub struct InjectSource {
    name: String,
    receiver: Receiver<Message>,
}

impl InjectSource {
    pub fn new(name: impl Into<String>) -> (Self, Sender<Message>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                name: name.into(),
                receiver: rx,
            },
            tx,
        )
    }
}

impl Module for InjectSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        // Block briefly for the first message, then drain whatever else is
        // already queued.
        match self.receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(msg) => ctx.add_output(msg),
            Err(_) => return ProcessStatus::Ok,
        }
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => ctx.add_output(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ProcessStatus::Ok
    }
}

/// A sink that forwards every received message to the host through a
/// crossbeam receiver.
pub struct CollectSink {
    name: String,
    sender: Sender<Message>,
}

impl CollectSink {
    pub fn new(name: impl Into<String>) -> (Self, Receiver<Message>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                name: name.into(),
                sender: tx,
            },
            rx,
        )
    }
}

impl Module for CollectSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus {
        let Ok(msg) = ctx.take_input() else {
            return ProcessStatus::FailedGetInput;
        };
        if self.sender.send(msg).is_err() {
            tracing::debug!(sink = %self.name, "host receiver gone, message discarded");
            return ProcessStatus::Error;
        }
        ProcessStatus::Ok
    }
}
