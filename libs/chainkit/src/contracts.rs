use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ModuleCtx;

/// Well-known capability tags.
pub mod capability {
    /// A blockchain network adapter. Resolved by `get_network`.
    pub const NETWORK: &str = "network";
    /// A backend integration (auth, linking, storage).
    pub const BACKEND: &str = "backend";
    /// A remote API client.
    pub const API: &str = "api";
}

/// Lets the core hand back a module as its concrete type.
///
/// Implemented for every sized `Send + Sync` type; modules never implement it
/// by hand.
pub trait IntoAnyArc {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> IntoAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Contract every feature module implements.
///
/// The core calls `setup` once, synchronously, while the module is being
/// registered; this is where a module registers its config keys. `start`
/// runs once when the core starts, after every module has been set up.
#[async_trait]
pub trait Module: IntoAnyArc + Send + Sync + 'static {
    /// Unique within one core.
    fn name(&self) -> &'static str;

    /// Capability tags other modules can look this module up by.
    fn capabilities(&self) -> &'static [&'static str] {
        &[]
    }

    fn setup(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
        Ok(())
    }

    async fn start(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// Drop every event listener the module holds.
    fn cleanup(&self) {}

    /// This module as a [`NetworkModule`], when it is one.
    ///
    /// Modules carrying the `network` capability override this with
    /// `Some(self)`.
    fn as_network(self: Arc<Self>) -> Option<Arc<dyn NetworkModule>> {
        None
    }
}

/// Contract behind the `network` capability.
///
/// Sibling modules reach a network through this trait only, so they never
/// depend on the crate that provides it.
pub trait NetworkModule: Module {
    fn is_connected(&self) -> bool;

    /// Sign `message` with the connected account.
    fn sign_message(&self, message: &str) -> anyhow::Result<String>;
}
