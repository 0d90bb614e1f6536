//! Process-wide module factory keyed by class-name strings.
//!
//! Declarative configs name module *classes*; the host registers a
//! constructor per class before starting any pipeline, and the runtime
//! instantiates and configures modules from those names. Registration is
//! write-only before start and read-only during execution.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::module::Module;

type Constructor = Box<dyn Fn(&str) -> Box<dyn Module> + Send + Sync>;

static REGISTRY: Lazy<RwLock<HashMap<String, Constructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The global module registry. All methods act on one process-wide table.
pub struct ModuleFactory;

impl ModuleFactory {
    /// Registers a constructor for `class_name`. The constructor receives the
    /// instance name from the graph node. Re-registering a class replaces the
    /// previous constructor.
    pub fn register<F>(class_name: impl Into<String>, constructor: F)
    where
        F: Fn(&str) -> Box<dyn Module> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        let mut registry = REGISTRY
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registry
            .insert(class_name.clone(), Box::new(constructor))
            .is_some()
        {
            tracing::warn!(class = %class_name, "module class re-registered");
        }
    }

    pub fn is_registered(class_name: &str) -> bool {
        REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(class_name)
    }

    /// Instantiates `class_name` as `instance_name` and calls
    /// `configure(config)` before returning. Unknown classes and configure
    /// failures yield an error and no module.
    pub fn create_module(
        class_name: &str,
        instance_name: &str,
        config: &Config,
    ) -> Result<Box<dyn Module>> {
        let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        let constructor = registry
            .get(class_name)
            .ok_or_else(|| PipelineError::UnknownModuleClass(class_name.to_string()))?;
        let mut module = constructor(instance_name);
        module.configure(config).map_err(|e| {
            tracing::error!(
                module = instance_name,
                class = class_name,
                error = %e,
                "module configuration failed"
            );
            e
        })?;
        Ok(module)
    }
}
