//! Built-in modules: a paced counter source, a pass-through transformer, a
//! logging sink, and host-bridge modules that inject into / collect from a
//! running pipeline over crossbeam channels.

mod bridge;
mod log_sink;
mod pass_through;
mod tick_source;

pub use bridge::{CollectSink, InjectSource};
pub use log_sink::LogSink;
pub use pass_through::PassThrough;
pub use tick_source::TickSource;

use crate::factory::ModuleFactory;

/// Registers every built-in module class that can be constructed from a
/// declarative config. Bridge modules need host-side channel endpoints and
/// are only available programmatically.
pub fn register_builtins() {
    ModuleFactory::register("TickSource", |name| Box::new(TickSource::new(name)));
    ModuleFactory::register("PassThrough", |name| Box::new(PassThrough::new(name)));
    ModuleFactory::register("LogSink", |name| Box::new(LogSink::new(name)));
}
