//! One module's runtime assembly: module + config + worker + dispatcher +
//! the worker thread that drives them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::channel::Channel;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::module::Module;
use crate::worker::{SharedModule, Worker, WorkerSettings};

pub struct ModuleActor {
    name: String,
    module: SharedModule,
    stop: Arc<AtomicBool>,
    /// Present until `start` moves it onto the worker thread.
    worker: Option<Worker>,
    handle: Option<JoinHandle<()>>,
}

impl ModuleActor {
    pub(crate) fn new(name: String, module: Box<dyn Module>, config: Config) -> Self {
        let module: SharedModule = Arc::new(Mutex::new(module));
        let stop = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher::new(config.get_or("cloneMessage", false));
        let settings = WorkerSettings::from_config(&config);
        let worker = Worker::new(
            name.clone(),
            Arc::clone(&module),
            dispatcher,
            Arc::clone(&stop),
            settings,
        );
        tracing::trace!(module = %name, "actor created");
        Self {
            name,
            module,
            stop,
            worker: Some(worker),
            handle: None,
        }
    }

    /// Registers an inbound channel view on the worker.
    pub(crate) fn add_input_queue(
        &mut self,
        queue_name: &str,
        channel: Arc<Channel<Message>>,
    ) -> Result<()> {
        let worker = self
            .worker
            .as_mut()
            .ok_or_else(|| PipelineError::AlreadyStarted(self.name.clone()))?;
        worker.add_input(queue_name, channel)
    }

    /// Registers an outbound channel view on the dispatcher.
    pub(crate) fn add_output_queue(
        &mut self,
        queue_name: &str,
        channel: Arc<Channel<Message>>,
    ) -> Result<()> {
        let worker = self
            .worker
            .as_mut()
            .ok_or_else(|| PipelineError::AlreadyStarted(self.name.clone()))?;
        worker.dispatcher_mut().add_subscriber(queue_name, channel)
    }

    /// Forwarded to the module.
    pub(crate) fn init(&mut self) -> Result<()> {
        self.module
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .init()
    }

    /// Forwarded to the module.
    pub(crate) fn deinit(&mut self) -> Result<()> {
        self.module
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deinit()
    }

    /// Spawns the worker thread running this actor's loop.
    pub(crate) fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(PipelineError::AlreadyStarted(self.name.clone()));
        }
        let worker = self
            .worker
            .take()
            .ok_or_else(|| PipelineError::AlreadyStarted(self.name.clone()))?;
        self.stop.store(false, Ordering::Relaxed);
        let handle = std::thread::Builder::new()
            .name(format!("actor-{}", self.name))
            .spawn(move || worker.run())
            .map_err(|e| {
                tracing::error!(module = %self.name, error = %e, "failed to spawn worker thread");
                PipelineError::WorkerStart(self.name.clone())
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Raises the stop flag and joins the worker thread. Safe to call on an
    /// actor that never started.
    pub(crate) fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(module = %self.name, "worker thread panicked");
                return Err(PipelineError::WorkerStop(self.name.clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ModuleActor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            tracing::warn!(module = %self.name, "actor dropped while running, stopping");
            let _ = self.stop();
        }
    }
}
