use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::Core;

/// Holder of a default [`Core`].
///
/// Most applications use [`CoreProvider::global`]. Code that needs isolation
/// (tests, several compositions in one process) either builds its own
/// `Core` and never touches a provider, or owns a separate `CoreProvider`.
#[derive(Default)]
pub struct CoreProvider {
    default: ArcSwapOption<Core>,
    init: Mutex<()>,
}

impl std::fmt::Debug for CoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreProvider")
            .field("has_default", &self.has_default())
            .finish()
    }
}

impl CoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide provider.
    pub fn global() -> &'static CoreProvider {
        static GLOBAL: OnceLock<CoreProvider> = OnceLock::new();
        GLOBAL.get_or_init(CoreProvider::new)
    }

    /// The current default core, created on first use.
    pub fn get_default(&self) -> Arc<Core> {
        if let Some(core) = self.default.load_full() {
            return core;
        }
        let _guard = self.init.lock();
        if let Some(core) = self.default.load_full() {
            return core;
        }
        tracing::debug!("Creating default core");
        let core = Arc::new(Core::new());
        self.default.store(Some(core.clone()));
        core
    }

    /// Replace the default core.
    pub fn set_default(&self, core: Arc<Core>) {
        let _guard = self.init.lock();
        self.default.store(Some(core));
    }

    /// Drop the current default; the next `get_default` creates a new one.
    pub fn clear_default(&self) -> Option<Arc<Core>> {
        let _guard = self.init.lock();
        self.default.swap(None)
    }

    pub fn has_default(&self) -> bool {
        self.default.load().is_some()
    }
}
