use std::sync::Arc;

use crate::config::Config;
use crate::event_bus::{BusEvent, Disposer, EventBus};
use crate::logger::ModuleLogger;

/// State every module carries: its name, a logger, the shared config
/// registry and its own event bus.
///
/// Concrete modules embed one and delegate to it:
///
/// ```rust,ignore
/// pub struct EvmNetwork {
///     base: ModuleBase<EvmEvent>,
/// }
///
/// impl Module for EvmNetwork {
///     fn name(&self) -> &'static str { self.base.name() }
///     fn cleanup(&self) { self.base.cleanup() }
/// }
/// ```
pub struct ModuleBase<E: BusEvent> {
    name: &'static str,
    logger: ModuleLogger,
    config: Arc<Config>,
    events: EventBus<E>,
}

impl<E: BusEvent> std::fmt::Debug for ModuleBase<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBase")
            .field("name", &self.name)
            .field("events", &self.events)
            .finish()
    }
}

impl<E: BusEvent> ModuleBase<E> {
    pub fn new(name: &'static str, config: Arc<Config>) -> Self {
        Self {
            name,
            logger: ModuleLogger::new(name, config.clone()),
            config,
            events: EventBus::new(name),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn logger(&self) -> &ModuleLogger {
        &self.logger
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn events(&self) -> &EventBus<E> {
        &self.events
    }

    pub fn listen<F>(&self, kind: E::Kind, handler: F) -> Disposer<E>
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.listen(kind, handler)
    }

    pub fn emit(&self, event: E) -> usize {
        self.events.emit(event)
    }

    pub fn cleanup(&self) {
        self.events.clear();
    }
}
