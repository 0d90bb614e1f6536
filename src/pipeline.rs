//! Pipeline materialization and lifecycle.
//!
//! A [`Pipeline`] turns a validated [`Graph`] into running actors and
//! channels:
//!
//! 1. **init** — walk the BFS edge list; for each unique `(src, dst)` create
//!    the two actors on first sight, a bounded channel, and register it under
//!    the canonical name `"<src> -> <dst>"` on the source's dispatcher and the
//!    destination's worker. Then call `init` on every module in topological
//!    order, aborting on the first failure.
//! 2. **start** — spawn every actor's worker thread in topological order.
//! 3. **stop** — shut down every channel (waking all blocked workers), then
//!    stop actors in topological order, joining their threads.
//! 4. **deinit** — call `deinit` in reverse topological order, then drop all
//!    actors and channels.
//!
//! The pipeline's own thread only drives lifecycle; after `start` it takes no
//! part in data movement.

use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

use crate::actor::ModuleActor;
use crate::channel::Channel;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::graph::Graph;
use crate::loader;
use crate::message::Message;
use crate::module::Module;

/// Default capacity of the channel materialized for each edge.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 5;

pub struct Pipeline {
    graph: Graph,
    channel_capacity: usize,
    channels: Vec<Arc<Channel<Message>>>,
    /// Actors keyed by module name, ordered by first appearance in the BFS
    /// edge list (a topological order).
    actors: IndexMap<String, ModuleActor>,
    initialized: bool,
}

impl Pipeline {
    /// Loads and validates a graph from a declarative YAML document.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let graph = loader::load_graph(path.as_ref())?;
        Ok(Self::with_graph(graph, DEFAULT_CHANNEL_CAPACITY))
    }

    pub(crate) fn with_graph(graph: Graph, channel_capacity: usize) -> Self {
        Self {
            graph,
            channel_capacity,
            channels: Vec::new(),
            actors: IndexMap::new(),
            initialized: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Materializes actors and channels, then initializes every module in
    /// topological order. On failure previously initialized modules stay
    /// initialized; the caller is expected to `deinit` explicitly.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(PipelineError::AlreadyStarted("pipeline".to_string()));
        }
        self.graph.validate()?;
        tracing::debug!(graph = %self.graph.name(), "initializing pipeline\n{}", self.graph);

        for (src, dst) in self.graph.edge_list_bfs(None) {
            self.ensure_actor(&src)?;
            self.ensure_actor(&dst)?;

            let channel = Arc::new(Channel::bounded(self.channel_capacity));
            let queue_name = format!("{src} -> {dst}");

            self.actor_mut(&src)?
                .add_output_queue(&queue_name, Arc::clone(&channel))?;
            self.actor_mut(&dst)?
                .add_input_queue(&queue_name, Arc::clone(&channel))?;
            self.channels.push(channel);
            tracing::trace!(queue = %queue_name, "channel created");
        }

        // A single-node graph has no edges; its actor is still materialized.
        let remaining: Vec<String> = self
            .graph
            .node_names()
            .filter(|n| !self.actors.contains_key(*n))
            .map(str::to_string)
            .collect();
        for name in remaining {
            self.ensure_actor(&name)?;
        }

        for (name, actor) in &mut self.actors {
            actor.init().map_err(|e| {
                tracing::error!(module = %name, error = %e, "module init failed");
                e
            })?;
            tracing::debug!(module = %name, "module initialized");
        }

        self.initialized = true;
        Ok(())
    }

    /// Starts every actor in topological order. A failure leaves the pipeline
    /// partially started; `stop` still works on the started subset.
    pub fn start(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(PipelineError::Uninitialized);
        }
        tracing::debug!(graph = %self.graph.name(), "starting pipeline");
        for (name, actor) in &mut self.actors {
            actor.start().map_err(|e| {
                tracing::error!(module = %name, error = %e, "actor start failed");
                e
            })?;
            tracing::debug!(module = %name, "actor started");
        }
        tracing::info!(graph = %self.graph.name(), "pipeline started");
        Ok(())
    }

    /// Shuts down every channel (unblocking all worker waits), then stops
    /// every actor in topological order, joining their threads.
    ///
    /// Every actor is stopped even if an earlier one fails; only stopping an
    /// actor raises its worker's stop flag, so skipping the rest would leave
    /// their threads spinning. The first error is returned after the full
    /// pass.
    pub fn stop(&mut self) -> Result<()> {
        tracing::debug!(graph = %self.graph.name(), "stopping pipeline");
        for channel in &self.channels {
            channel.shutdown();
        }
        let mut first_error = None;
        for (name, actor) in &mut self.actors {
            match actor.stop() {
                Ok(()) => tracing::debug!(module = %name, "actor stopped"),
                Err(e) => {
                    tracing::error!(module = %name, error = %e, "actor stop failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        tracing::info!(graph = %self.graph.name(), "pipeline stopped");
        Ok(())
    }

    /// De-initializes every module in reverse topological order, then drops
    /// all actors and channels.
    pub fn deinit(&mut self) -> Result<()> {
        for i in (0..self.actors.len()).rev() {
            let Some((name, actor)) = self.actors.get_index_mut(i) else {
                continue;
            };
            let name = name.clone();
            actor.deinit().map_err(|e| {
                tracing::error!(module = %name, error = %e, "module deinit failed");
                e
            })?;
            tracing::debug!(module = %name, "module deinitialized");
        }
        self.actors.clear();
        self.channels.clear();
        self.initialized = false;
        Ok(())
    }

    /// True while at least one worker thread is running.
    pub fn is_running(&self) -> bool {
        self.actors.values().any(ModuleActor::is_running)
    }

    fn ensure_actor(&mut self, name: &str) -> Result<()> {
        if self.actors.contains_key(name) {
            return Ok(());
        }
        let (module, config) = self.graph.resolve_module(name)?;
        let actor = ModuleActor::new(name.to_string(), module, config);
        self.actors.insert(name.to_string(), actor);
        Ok(())
    }

    fn actor_mut(&mut self, name: &str) -> Result<&mut ModuleActor> {
        self.actors
            .get_mut(name)
            .ok_or_else(|| PipelineError::Config(format!("no actor for node '{name}'")))
    }
}

/// Fluent programmatic construction of a [`Pipeline`].
///
/// ```no_run
/// # use flowline::PipelineBuilder;
/// # use flowline::modules::{TickSource, LogSink};
/// let mut pipeline = PipelineBuilder::new("demo")
///     .add_module(Box::new(TickSource::new("ticker")))
///     .add_module(Box::new(LogSink::new("logger")))
///     .connect("ticker", "logger")
///     .build()
///     .unwrap();
/// pipeline.init().unwrap();
/// ```
pub struct PipelineBuilder {
    graph: Graph,
    channel_capacity: usize,
    /// First construction error, surfaced at `build`.
    error: Option<PipelineError>,
}

impl PipelineBuilder {
    pub fn new(graph_name: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(graph_name),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            error: None,
        }
    }

    /// Adds a module instance under its own name, with an empty config.
    pub fn add_module(self, module: Box<dyn Module>) -> Self {
        self.add_module_with_config(module, Config::default())
    }

    /// Adds a module instance with a per-node config (how programmatic
    /// pipelines set reserved keys such as `syncInputs`).
    pub fn add_module_with_config(mut self, module: Box<dyn Module>, config: Config) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.graph.add_module_node(module, config) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Declares a directed connection between two added modules.
    pub fn connect(mut self, src: &str, dst: &str) -> Self {
        if self.error.is_none() {
            if !self.graph.contains_node(src) || !self.graph.contains_node(dst) {
                self.error = Some(PipelineError::UnknownConnection {
                    from: src.to_string(),
                    to: dst.to_string(),
                });
            } else {
                self.graph.add_edge(src, dst);
            }
        }
        self
    }

    /// Overrides the per-edge channel capacity (default 5).
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Validates the assembled graph and produces the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.graph.validate()?;
        Ok(Pipeline::with_graph(self.graph, self.channel_capacity))
    }
}
