//! The coordinator: owns the shared config registry and the module table,
//! runs `setup` on registration and `start` on every module, in order.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::context::ModuleCtx;
use crate::contracts::{Module, NetworkModule};
use crate::core_config;
use crate::errors::CoreError;
use crate::registry::{self, ModuleDirectory, ModuleEntry, ModuleState};

/// Coordinator phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorePhase {
    /// Modules may be registered.
    Registering,
    Starting,
    Started,
    /// A module's `start` failed.
    Failed,
}

pub struct Core {
    config: Arc<Config>,
    modules: Arc<ModuleDirectory>,
    phase: Mutex<CorePhase>,
    // Held for a whole registration and while `start` leaves `Registering`.
    registration: Mutex<()>,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("phase", &self.phase())
            .field("modules", &self.modules.module_names())
            .field("keys", &self.config.get_keys())
            .finish()
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    /// A fresh core with its own registry, holding only the core config keys.
    pub fn new() -> Self {
        let config = Arc::new(Config::new());
        if let Err(err) = core_config::register(&config) {
            tracing::error!(error = %err, "Failed to register core config keys");
        }
        Self {
            config,
            modules: Arc::new(ModuleDirectory::default()),
            phase: Mutex::new(CorePhase::Registering),
            registration: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn modules(&self) -> &Arc<ModuleDirectory> {
        &self.modules
    }

    pub fn phase(&self) -> CorePhase {
        *self.phase.lock()
    }

    pub fn is_started(&self) -> bool {
        self.phase() == CorePhase::Started
    }

    fn ctx_for(&self, module: &'static str) -> ModuleCtx {
        ModuleCtx::new(module, self.config.clone(), self.modules.clone())
    }

    /// Add `module` and run its `setup`.
    ///
    /// If `setup` fails the module is not added and the config keys it
    /// registered are rolled back. Registrations are serialized, so `setup`
    /// must not register another module on the same core.
    pub fn register_module(&self, module: Arc<dyn Module>) -> Result<(), CoreError> {
        let _registering = self.registration.lock();
        let name = module.name();
        if self.phase() != CorePhase::Registering {
            return Err(CoreError::RegistrationClosed(name.to_string()));
        }
        if self.modules.has_module(name) {
            return Err(CoreError::ModuleAlreadyRegistered(name.to_string()));
        }

        let entry = ModuleEntry::new(module);
        let keys_before = self.config.key_count();
        if let Err(source) = entry.core.setup(&self.ctx_for(name)) {
            self.config.truncate_keys(keys_before);
            tracing::warn!(module = name, error = %source, "Module setup failed");
            return Err(CoreError::Setup {
                module: name.to_string(),
                source,
            });
        }
        entry.set_state(ModuleState::SetupComplete);

        if let Err(err) = self.modules.insert(entry) {
            self.config.truncate_keys(keys_before);
            return Err(err);
        }
        tracing::info!(module = name, "Module registered");
        Ok(())
    }

    /// Register several modules in order, stopping at the first failure.
    pub fn register_modules<I>(&self, modules: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = Arc<dyn Module>>,
    {
        modules
            .into_iter()
            .try_for_each(|m| self.register_module(m))
    }

    /// Register every module submitted with [`crate::submit_module!`],
    /// dependencies first. Modules already registered by name are skipped.
    pub fn register_discovered(&self) -> Result<(), CoreError> {
        let found: Vec<_> = registry::discovered()
            .into_iter()
            .filter(|r| !self.modules.has_module(r.name))
            .collect();
        let order = registry::resolve_order(&found, |name| self.modules.has_module(name))?;
        for r in order {
            (r.register)(self)?;
        }
        Ok(())
    }

    /// Run every module's `start`, one at a time, in registration order.
    ///
    /// The first failure aborts: later modules are never started and the core
    /// ends in [`CorePhase::Failed`]. There is no timeout; a `start` that never
    /// completes keeps this future pending.
    pub async fn start(&self) -> Result<(), CoreError> {
        {
            let _registering = self.registration.lock();
            let mut phase = self.phase.lock();
            if *phase != CorePhase::Registering {
                return Err(CoreError::AlreadyStarted);
            }
            *phase = CorePhase::Starting;
        }

        let entries = self.modules.entries();
        tracing::info!(
            modules = ?entries.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Phase: start"
        );

        for entry in entries {
            tracing::debug!(module = entry.name, "Starting module");
            if let Err(source) = entry.core.start(&self.ctx_for(entry.name)).await {
                entry.set_state(ModuleState::Failed);
                *self.phase.lock() = CorePhase::Failed;
                tracing::error!(module = entry.name, error = %source, "Module start failed");
                return Err(CoreError::Start {
                    module: entry.name.to_string(),
                    source,
                });
            }
            entry.set_state(ModuleState::Started);
        }

        *self.phase.lock() = CorePhase::Started;
        tracing::info!("All modules started");
        Ok(())
    }

    // Lookups, delegated to the module table.

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.has_module(name)
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.module_names()
    }

    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.modules.module_state(name)
    }

    pub fn get_module(&self, name: &str) -> Result<Arc<dyn Module>, CoreError> {
        self.modules.get_module(name)
    }

    pub fn get_module_as<T: Module>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        self.modules.get_module_as(name)
    }

    pub fn get_module_by_capability(&self, capability: &str) -> Result<Arc<dyn Module>, CoreError> {
        self.modules.get_module_by_capability(capability)
    }

    pub fn get_module_by_capability_as<T: Module>(
        &self,
        capability: &str,
    ) -> Result<Arc<T>, CoreError> {
        self.modules.get_module_by_capability_as(capability)
    }

    pub fn get_network(&self, name: &str) -> Result<Arc<dyn NetworkModule>, CoreError> {
        self.modules.get_network(name)
    }

    pub fn find_network(&self) -> Result<Arc<dyn NetworkModule>, CoreError> {
        self.modules.find_network()
    }
}
