//! Error types shared across the runtime.

use thiserror::Error;

/// Errors surfaced by the pipeline runtime.
///
/// Lifecycle errors (`init`, `start`, `stop`, `deinit`) bubble up to the
/// caller and abort the current phase. Per-message failures never appear
/// here — workers log them and move on to the next batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("generic failure")]
    Failure,

    #[error("'{0}' is already started")]
    AlreadyStarted(String),

    #[error("'{0}' is already stopped")]
    AlreadyStopped(String),

    #[error("failed to start worker thread for '{0}'")]
    WorkerStart(String),

    #[error("failed to stop worker thread for '{0}'")]
    WorkerStop(String),

    #[error("pipeline is not initialized")]
    Uninitialized,

    #[error("cycle detected in graph '{0}'")]
    CycleDetected(String),

    #[error("graph is empty or has no name")]
    EmptyGraph,

    #[error("node '{0}' is not connected to any edge")]
    DisconnectedNode(String),

    #[error("duplicate module name '{0}'")]
    DuplicateModule(String),

    #[error("queue '{0}' is already registered")]
    DuplicateQueue(String),

    #[error("unknown module class '{0}'")]
    UnknownModuleClass(String),

    #[error("connection '{from} -> {to}' refers to an unknown module")]
    UnknownConnection { from: String, to: String },

    #[error("input payload is not a single message")]
    NotSingleInput,

    #[error("input payload is not a tagged message set")]
    NotMultiInput,

    #[error("no input message tagged '{0}'")]
    MissingTag(String),

    #[error("payload type mismatch: requested {requested}, actual {actual}")]
    TypeMismatch {
        requested: &'static str,
        actual: String,
    },

    #[error("module '{module}': {message}")]
    Module { module: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),
}

impl PipelineError {
    /// Shorthand for a module-defined lifecycle error.
    pub fn module(module: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Module {
            module: module.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
