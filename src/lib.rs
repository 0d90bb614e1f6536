//! # Flowline: a dataflow pipeline runtime
//!
//! Executes a user-declared DAG of processing *modules* connected by bounded,
//! thread-safe message channels. Each module runs on its own worker thread;
//! messages flow edge-by-edge from sources through transformers to sinks.
//!
//! ## Architecture
//!
//! - **Graph**: named nodes + edges, Kahn-based cycle detection and a
//!   deterministic BFS edge enumeration that maps each unique edge to one
//!   channel.
//! - **Message**: type-erased, reference-counted payload with copy-on-write
//!   mutation and metadata (monotonic id, timestamp, source tag).
//! - **Channel**: bounded blocking MPMC FIFO with a sticky shutdown state.
//! - **Worker**: per-module loop — source, free-running batch, or
//!   message-id-synchronized fusion (`syncInputs`).
//! - **Pipeline**: materializes the graph into actors and channels and drives
//!   the init → start → stop → deinit lifecycle.
//!
//! ## Example
//!
//! ```no_run
//! use flowline::{modules, Pipeline};
//!
//! fn main() -> flowline::Result<()> {
//!     modules::register_builtins();
//!
//!     let mut pipeline = Pipeline::from_yaml("demos/tick-pipeline.yaml")?;
//!     pipeline.init()?;
//!     pipeline.start()?;
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     pipeline.stop()?;
//!     pipeline.deinit()?;
//!     Ok(())
//! }
//! ```
//!
//! Topologies can equally be assembled programmatically with
//! [`PipelineBuilder`], supplying module instances directly.

mod actor;
mod dispatcher;
mod worker;

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod graph;
pub mod loader;
pub mod message;
pub mod module;
pub mod modules;
pub mod pipeline;

// Re-export the types a host program touches.
pub use config::{Config, ConfigValue};
pub use context::{ProcessStatus, ProcessingContext};
pub use error::{PipelineError, Result};
pub use factory::ModuleFactory;
pub use graph::Graph;
pub use message::{Message, MessageMeta};
pub use module::Module;
pub use pipeline::{Pipeline, PipelineBuilder, DEFAULT_CHANNEL_CAPACITY};
