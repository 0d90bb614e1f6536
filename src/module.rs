//! The module capability: the contract every processing unit implements.
//!
//! A module focuses exclusively on "what to do with data". It passively
//! receives input through its [`ProcessingContext`] and emits results into
//! the same context. Threading, channel I/O and lifecycle sequencing are
//! handled by the runtime.

use crate::config::Config;
use crate::context::{ProcessStatus, ProcessingContext};
use crate::error::Result;

/// Trait for user-defined processing modules.
///
/// Lifecycle: `configure` once when the node is resolved, `init` during
/// pipeline init (topological order), `process` / `process_batch` from the
/// worker loop, `deinit` during pipeline deinit (reverse topological order).
///
/// `process` must return within a reasonable time so the pipeline stays
/// responsive to stop requests; the runtime never preempts it. Sources that
/// need pacing sleep inside `process` themselves.
pub trait Module: Send {
    /// Unique instance name of this module within the graph.
    fn name(&self) -> &str;

    /// Called once with the node's configuration before the pipeline starts.
    fn configure(&mut self, _config: &Config) -> Result<()> {
        Ok(())
    }

    /// One-time setup before any processing happens.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Process one invocation's inputs and produce outputs via the context.
    fn process(&mut self, ctx: &mut ProcessingContext) -> ProcessStatus;

    /// Process a batch of contexts, returning one status per context (in
    /// order). The default simply iterates [`Module::process`].
    fn process_batch(&mut self, contexts: &mut [ProcessingContext]) -> Vec<ProcessStatus> {
        contexts.iter_mut().map(|ctx| self.process(ctx)).collect()
    }

    /// Resource cleanup after the pipeline has stopped.
    fn deinit(&mut self) -> Result<()> {
        Ok(())
    }
}
