//! Per-actor output multiplexer.
//!
//! Holds an ordered table of downstream channels keyed by the canonical edge
//! name `"<src> -> <dst>"`. Broadcast fans a message out as one shared-cell
//! handle per subscriber (a refcount bump, not a copy); the COW discipline on
//! [`Message`](crate::message::Message) keeps downstream mutation isolated.
//! A full subscriber drops the message rather than stalling the producer; the
//! `cloneMessage` node config opts into deep-cloning per subscriber instead.

use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::channel::Channel;
use crate::error::{PipelineError, Result};
use crate::message::Message;

pub(crate) struct Dispatcher {
    subscribers: IndexMap<String, Arc<Channel<Message>>>,
    clone_on_broadcast: bool,
    dropped: AtomicU64,
}

impl Dispatcher {
    pub(crate) fn new(clone_on_broadcast: bool) -> Self {
        Self {
            subscribers: IndexMap::new(),
            clone_on_broadcast,
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn add_subscriber(
        &mut self,
        name: impl Into<String>,
        channel: Arc<Channel<Message>>,
    ) -> Result<()> {
        let name = name.into();
        if self.subscribers.contains_key(&name) {
            return Err(PipelineError::DuplicateQueue(name));
        }
        self.subscribers.insert(name, channel);
        Ok(())
    }

    /// Pushes the message to every subscriber in subscription order.
    /// Observationally equivalent to one [`Dispatcher::send_to`] per
    /// subscriber; each fan-out copy is a refcount bump on the shared cell.
    pub(crate) fn broadcast(&self, msg: Message) {
        for name in self.subscribers.keys() {
            self.send_to(name, msg.clone());
        }
    }

    /// Pushes to the named subscriber only; unknown names are a no-op.
    /// Non-blocking: a full or shut-down channel drops the message.
    pub(crate) fn send_to(&self, name: &str, msg: Message) {
        let Some(channel) = self.subscribers.get(name) else {
            return;
        };
        let out = if self.clone_on_broadcast {
            msg.deep_clone()
        } else {
            msg
        };
        if !channel.try_push(out) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(queue = %name, "subscriber full, message dropped");
        }
    }

    /// Total messages dropped because a subscriber was full or shut down.
    pub(crate) fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
