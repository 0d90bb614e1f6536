//! The per-actor worker loop.
//!
//! One worker drives one module on a dedicated thread until its stop flag is
//! raised. The loop shape is fixed at start from two facts:
//!
//! - **source** — the actor has no input channels: invoke the module once per
//!   iteration around an empty message; the module paces itself.
//! - **fusion** (`syncInputs: true`) — group one message per upstream with a
//!   matching message id before invoking the module.
//! - otherwise — free-running batch loop: a greedy non-blocking drain across
//!   all inputs followed by short 1 ms timed polls until the batch fills or
//!   the batch window elapses. Blocking on the short poll keeps an idle
//!   worker off the CPU while staying responsive.
//!
//! Per-message failures are logged and skipped; they never take the loop
//! down. Stop is observed at the top of every iteration, and pipeline-level
//! channel shutdown unblocks any in-flight wait.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::channel::Channel;
use crate::config::Config;
use crate::context::{ProcessStatus, ProcessingContext};
use crate::dispatcher::Dispatcher;
use crate::message::Message;
use crate::module::Module;

/// Module handle shared between the actor (init/deinit) and the worker
/// thread (process).
pub(crate) type SharedModule = Arc<Mutex<Box<dyn Module>>>;

const DEFAULT_MAX_BATCH_SIZE: usize = 4;
const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_millis(100);
const DEFAULT_FUSION_TIMEOUT: Duration = Duration::from_secs(60);
/// Per-channel wait inside the batch polling phase and the idle pause of the
/// fusion sweep.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub(crate) struct WorkerSettings {
    pub(crate) sync_inputs: bool,
    pub(crate) max_batch_size: usize,
    pub(crate) batch_timeout: Duration,
    pub(crate) fusion_timeout: Duration,
}

impl WorkerSettings {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            sync_inputs: config.get_or("syncInputs", false),
            max_batch_size: config.get_or("maxBatchSize", DEFAULT_MAX_BATCH_SIZE as i64).max(1)
                as usize,
            batch_timeout: Duration::from_millis(config.get_or(
                "batchTimeoutMs",
                DEFAULT_BATCH_TIMEOUT.as_millis() as i64,
            ) as u64),
            fusion_timeout: Duration::from_millis(config.get_or(
                "fusionTimeoutMs",
                DEFAULT_FUSION_TIMEOUT.as_millis() as i64,
            ) as u64),
        }
    }
}

/// Partially assembled fusion tuple, keyed by message id in the cache.
struct FusionSlot {
    first_seen: Instant,
    inputs: IndexMap<String, Message>,
}

pub(crate) struct Worker {
    module_name: String,
    module: SharedModule,
    inputs: IndexMap<String, Arc<Channel<Message>>>,
    dispatcher: Dispatcher,
    stop: Arc<AtomicBool>,
    settings: WorkerSettings,
}

impl Worker {
    pub(crate) fn new(
        module_name: String,
        module: SharedModule,
        dispatcher: Dispatcher,
        stop: Arc<AtomicBool>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            module_name,
            module,
            inputs: IndexMap::new(),
            dispatcher,
            stop,
            settings,
        }
    }

    pub(crate) fn add_input(
        &mut self,
        name: impl Into<String>,
        channel: Arc<Channel<Message>>,
    ) -> crate::error::Result<()> {
        let name = name.into();
        if self.inputs.contains_key(&name) {
            return Err(crate::error::PipelineError::DuplicateQueue(name));
        }
        self.inputs.insert(name, channel);
        Ok(())
    }

    pub(crate) fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// The thread entry point. Returns when the stop flag is raised.
    pub(crate) fn run(mut self) {
        let is_source = self.inputs.is_empty();
        tracing::info!(
            module = %self.module_name,
            is_source,
            sync_inputs = self.settings.sync_inputs,
            "worker started"
        );

        if self.settings.sync_inputs && !is_source {
            self.run_fusion();
        } else {
            if self.settings.sync_inputs {
                tracing::warn!(
                    module = %self.module_name,
                    "syncInputs set on a source module, running source loop"
                );
            }
            self.run_batched(is_source);
        }

        let dropped = self.dispatcher.dropped_count();
        if dropped > 0 {
            tracing::warn!(module = %self.module_name, dropped, "messages dropped on full subscribers");
        }
        tracing::info!(module = %self.module_name, "worker finished");
    }

    fn run_batched(&mut self, is_source: bool) {
        while !self.stop.load(Ordering::Relaxed) {
            let mut contexts = if is_source {
                vec![ProcessingContext::single(Message::empty())]
            } else {
                self.pull_batch()
            };
            // The module sees every iteration, empty batch included, so a
            // custom process_batch can use the tick (periodic flush etc.).
            let statuses = self.invoke(&mut contexts);
            self.dispatch(contexts, statuses);
        }
    }

    /// Two-phase batch pull across all input channels.
    fn pull_batch(&self) -> Vec<ProcessingContext> {
        let max = self.settings.max_batch_size;
        let mut batch: Vec<Message> = Vec::with_capacity(max);
        let start = Instant::now();

        // Phase 1: greedy non-blocking drain in input order.
        for channel in self.inputs.values() {
            while batch.len() < max {
                match channel.try_pop() {
                    Some(msg) => batch.push(msg),
                    None => break,
                }
            }
            if batch.len() >= max {
                return Self::wrap_batch(batch);
            }
        }

        // Phase 2: short timed polls until the batch fills or the window
        // elapses; a hit drains that channel greedily before moving on.
        while !self.stop.load(Ordering::Relaxed) {
            if batch.len() >= max || start.elapsed() >= self.settings.batch_timeout {
                break;
            }
            for channel in self.inputs.values() {
                if let Some(msg) = channel.pop_timeout(POLL_INTERVAL) {
                    batch.push(msg);
                    while batch.len() < max {
                        match channel.try_pop() {
                            Some(msg) => batch.push(msg),
                            None => break,
                        }
                    }
                }
                if batch.len() >= max {
                    break;
                }
            }
        }

        Self::wrap_batch(batch)
    }

    fn wrap_batch(batch: Vec<Message>) -> Vec<ProcessingContext> {
        batch.into_iter().map(ProcessingContext::single).collect()
    }

    /// Synchronized fan-in: hold messages until one arrived from every
    /// upstream with the same message id, then process the tuple.
    fn run_fusion(&mut self) {
        let expected = self.inputs.len();
        let mut cache: HashMap<u64, FusionSlot> = HashMap::new();

        while !self.stop.load(Ordering::Relaxed) {
            let mut received = false;
            for channel in self.inputs.values() {
                if let Some(msg) = channel.try_pop() {
                    received = true;
                    let id = msg.meta().message_id;
                    let source = msg.meta().source_name.clone();
                    let slot = cache.entry(id).or_insert_with(|| FusionSlot {
                        first_seen: Instant::now(),
                        inputs: IndexMap::new(),
                    });
                    if slot.inputs.insert(source.clone(), msg).is_some() {
                        tracing::debug!(
                            module = %self.module_name,
                            message_id = id,
                            source = %source,
                            "duplicate fusion input replaced"
                        );
                    }
                    tracing::trace!(
                        module = %self.module_name,
                        message_id = id,
                        source = %source,
                        "fusion input cached"
                    );
                }
            }

            let ready: Vec<u64> = cache
                .iter()
                .filter(|(_, slot)| slot.inputs.len() == expected)
                .map(|(&id, _)| id)
                .collect();
            let expired: Vec<u64> = cache
                .iter()
                .filter(|(_, slot)| {
                    slot.inputs.len() != expected
                        && slot.first_seen.elapsed() >= self.settings.fusion_timeout
                })
                .map(|(&id, _)| id)
                .collect();

            for id in expired {
                tracing::warn!(
                    module = %self.module_name,
                    message_id = id,
                    "fusion tuple timed out, evicting"
                );
                cache.remove(&id);
            }

            for id in ready {
                if let Some(slot) = cache.remove(&id) {
                    let mut contexts = vec![ProcessingContext::multi(slot.inputs)];
                    let statuses = self.invoke(&mut contexts);
                    self.dispatch(contexts, statuses);
                }
            }

            if !received {
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }

    fn invoke(&self, contexts: &mut [ProcessingContext]) -> Vec<ProcessStatus> {
        let mut module = self.module.lock().unwrap_or_else(PoisonError::into_inner);
        module.process_batch(contexts)
    }

    /// Forwards collected outputs for every OK context; failed contexts are
    /// logged and skipped.
    fn dispatch(&self, contexts: Vec<ProcessingContext>, statuses: Vec<ProcessStatus>) {
        if contexts.len() != statuses.len() {
            tracing::warn!(
                module = %self.module_name,
                contexts = contexts.len(),
                statuses = statuses.len(),
                "process_batch returned a mismatched status count"
            );
        }
        for (mut ctx, status) in contexts.into_iter().zip(statuses) {
            match status {
                ProcessStatus::Ok => {
                    for msg in ctx.collect_outputs() {
                        self.dispatcher.broadcast(msg);
                    }
                }
                ProcessStatus::Error | ProcessStatus::FailedGetInput => {
                    tracing::debug!(
                        module = %self.module_name,
                        ?status,
                        "processing failed, output skipped"
                    );
                }
            }
        }
    }
}
