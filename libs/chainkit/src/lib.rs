//! # ChainKit - Modular Composition Kernel
//!
//! The kernel a set of independently packaged feature modules (network
//! adapters, backend integrations, API clients) plugs into.
//!
//! ## Features
//!
//! - **Typed config registry**: modules register validated keys during `setup`;
//!   the application reads, writes and merges values afterwards
//! - **Lifecycle**: `register_module` runs `setup`, `start` runs every module's
//!   `start` sequentially in registration order
//! - **Capability lookup**: modules find siblings by capability tag, never by
//!   concrete type
//! - **Per-module event bus**: typed events, isolated handler failures
//! - **Auto-discovery**: modules can be submitted via `inventory`
//!
//! ## Basic Example
//!
//! ```rust,ignore
//! use chainkit::{Core, Module, ModuleCtx};
//!
//! let core = Core::new();
//! core.register_module(EvmNetwork::create(&core))?;
//! core.register_module(BackendServer::create(&core))?;
//!
//! core.config().merge([("appId", json!("my-app")), ("serverUrl", json!("https://api.example"))])?;
//! core.start().await?;
//!
//! let network = core.get_module_by_capability("network")?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Re-export inventory for submit_module!
pub use inventory;

pub mod config;
pub mod context;
pub mod contracts;
pub mod coordinator;
pub mod core_config;
pub mod errors;
pub mod event_bus;
pub mod logger;
pub mod module_base;
pub mod provider;
pub mod registry;

pub use crate::config::{validators, Config, ConfigKey, ConfigValue, ConfigValues};
pub use crate::context::ModuleCtx;
pub use crate::contracts::{capability, Module, NetworkModule};
pub use crate::coordinator::{Core, CorePhase};
pub use crate::core_config::{BuildEnvironment, LogLevel};
pub use crate::errors::{ConfigError, CoreError};
pub use crate::event_bus::{BusEvent, Disposer, EventBus};
pub use crate::logger::ModuleLogger;
pub use crate::module_base::ModuleBase;
pub use crate::provider::CoreProvider;
pub use crate::registry::{ModuleDirectory, ModuleState, Registrator};
