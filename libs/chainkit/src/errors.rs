//! Structured errors for the config registry and the core coordinator.

use thiserror::Error;

/// Errors raised by [`crate::config::Config`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("key '{key}' is already registered")]
    KeyAlreadyExists { key: String },

    #[error("key '{key}' is unregistered; have you registered all required modules?")]
    KeyNotRegistered { key: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidConfigValue { key: String, reason: String },

    #[error("key '{key}' holds a value of type {found}, requested as {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl ConfigError {
    /// Name of the key the error refers to.
    pub fn key(&self) -> &str {
        match self {
            ConfigError::KeyAlreadyExists { key }
            | ConfigError::KeyNotRegistered { key }
            | ConfigError::InvalidConfigValue { key, .. }
            | ConfigError::TypeMismatch { key, .. } => key,
        }
    }
}

/// Errors raised by the coordinator and module lookups.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("module '{0}' is already registered")]
    ModuleAlreadyRegistered(String),

    #[error("module '{0}' is not registered")]
    ModuleNotFound(String),

    #[error("module '{module}' is not a {expected}")]
    ModuleTypeMismatch {
        module: String,
        expected: &'static str,
    },

    #[error("no module provides capability '{0}'")]
    CapabilityNotFound(String),

    #[error("capability '{capability}' is provided by several modules: {}", modules.join(", "))]
    AmbiguousCapability {
        capability: String,
        modules: Vec<String>,
    },

    #[error("module '{module}' does not provide capability '{capability}'")]
    MissingCapability { module: String, capability: String },

    #[error("cannot register module '{0}': the core has already been started")]
    RegistrationClosed(String),

    #[error("the core has already been started")]
    AlreadyStarted,

    #[error("setup failed for module '{module}'")]
    Setup {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("start failed for module '{module}'")]
    Start {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Discovery errors
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },

    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<&'static str> },
}

impl CoreError {
    /// Finds a [`ConfigError`] anywhere in this error's source chain.
    ///
    /// Module hooks return `anyhow::Error`, so a config failure raised during
    /// `setup` or `start` ends up wrapped inside [`CoreError::Setup`] or
    /// [`CoreError::Start`].
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self {
            CoreError::Config(e) => Some(e),
            CoreError::Setup { source, .. } | CoreError::Start { source, .. } => {
                source.chain().find_map(|e| e.downcast_ref::<ConfigError>())
            }
            _ => None,
        }
    }
}
