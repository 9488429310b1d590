use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::core_config::{LogLevel, LOG_LEVEL};

/// Per-module logger.
///
/// Records are forwarded to `tracing` with a `module` field. When the core
/// `logLevel` key is registered, records below it are dropped before they
/// reach the subscriber.
#[derive(Clone)]
pub struct ModuleLogger {
    module: &'static str,
    config: Arc<Config>,
}

impl fmt::Debug for ModuleLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLogger")
            .field("module", &self.module)
            .finish()
    }
}

impl ModuleLogger {
    pub fn new(module: &'static str, config: Arc<Config>) -> Self {
        Self { module, config }
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Whether a record at `level` passes the configured `logLevel`.
    pub fn enabled(&self, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        match self.config.get(&LOG_LEVEL) {
            Ok(threshold) => level >= threshold,
            // Without the core keys there is nothing to filter on.
            Err(_) => true,
        }
    }

    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let module = self.module;
        match level {
            LogLevel::Verbose => tracing::trace!(module, "{}", args),
            LogLevel::Debug => tracing::debug!(module, "{}", args),
            LogLevel::Info => tracing::info!(module, "{}", args),
            LogLevel::Warning => tracing::warn!(module, "{}", args),
            LogLevel::Error => tracing::error!(module, "{}", args),
            LogLevel::Off => {}
        }
    }

    pub fn verbose(&self, message: impl fmt::Display) {
        self.log(LogLevel::Verbose, format_args!("{message}"));
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, format_args!("{message}"));
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, format_args!("{message}"));
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warning, format_args!("{message}"));
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, format_args!("{message}"));
    }
}
