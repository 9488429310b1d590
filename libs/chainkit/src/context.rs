use std::sync::Arc;

use crate::config::Config;
use crate::registry::ModuleDirectory;

/// Handed to a module's `setup` and `start` hooks.
///
/// Gives access to the shared config registry and to the sibling modules
/// registered on the same core. Modules should not keep it beyond the hook.
#[derive(Clone)]
pub struct ModuleCtx {
    module_name: &'static str,
    config: Arc<Config>,
    modules: Arc<ModuleDirectory>,
}

impl std::fmt::Debug for ModuleCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCtx")
            .field("module_name", &self.module_name)
            .finish()
    }
}

impl ModuleCtx {
    pub fn new(
        module_name: &'static str,
        config: Arc<Config>,
        modules: Arc<ModuleDirectory>,
    ) -> Self {
        Self {
            module_name,
            config,
            modules,
        }
    }

    pub fn module_name(&self) -> &'static str {
        self.module_name
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn modules(&self) -> &ModuleDirectory {
        &self.modules
    }
}
