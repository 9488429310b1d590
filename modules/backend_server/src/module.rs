use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chainkit::{capability, Core, Disposer, Module, ModuleBase, ModuleCtx, NetworkModule};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::{self, APP_ID, SERVER_URL};
use crate::errors::ServerError;
use crate::events::{ServerEvent, ServerEventKind};

const LINK_MESSAGE: &str = "ChainKit: Link users";

/// Settings captured at start, plus the network used for signing.
struct Session {
    app_id: String,
    server_url: String,
    network: Arc<dyn NetworkModule>,
}

/// Backend integration, `backend` capability.
///
/// Links EVM addresses to the current application by having the network
/// module sign a linking message. The backend itself is simulated in memory.
pub struct BackendServer {
    base: ModuleBase<ServerEvent>,
    session: ArcSwapOption<Session>,
    linked: RwLock<Vec<String>>,
}

chainkit::submit_module!(
    name = BackendServer::NAME,
    deps = ["evm"],
    factory = BackendServer::create,
);

impl BackendServer {
    pub const NAME: &'static str = "server";

    pub fn create(core: &Core) -> Arc<Self> {
        Arc::new(Self {
            base: ModuleBase::new(Self::NAME, core.config().clone()),
            session: ArcSwapOption::from(None),
            linked: RwLock::new(Vec::new()),
        })
    }

    pub fn listen<F>(&self, kind: ServerEventKind, handler: F) -> Disposer<ServerEvent>
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.base.listen(kind, handler)
    }

    pub fn is_initialized(&self) -> bool {
        self.session.load().is_some()
    }

    pub fn server_url(&self) -> Option<String> {
        self.session.load().as_ref().map(|s| s.server_url.clone())
    }

    pub fn linked_addresses(&self) -> Vec<String> {
        self.linked.read().clone()
    }

    /// Link `address` to the application.
    ///
    /// The address is lowercased. Linking an already linked address signs
    /// again but does not duplicate it. Returns the signature.
    pub fn link_address(&self, address: &str) -> Result<String, ServerError> {
        let session = self.session.load_full().ok_or(ServerError::NotInitialized)?;
        let address = normalize_address(address)?;

        let data = format!(
            "{LINK_MESSAGE}\n\nappId: {}\naddress: {address}",
            session.app_id
        );
        if !session.network.is_connected() {
            return Err(ServerError::NotConnected);
        }
        let signature = session
            .network
            .sign_message(&data)
            .map_err(ServerError::Network)?;

        {
            let mut linked = self.linked.write();
            if !linked.contains(&address) {
                linked.push(address.clone());
            }
        }

        self.base
            .logger()
            .debug(format_args!("Linked address {address}"));
        self.base.emit(ServerEvent::AddressLinked {
            address,
            signature: signature.clone(),
        });
        Ok(signature)
    }

    pub fn unlink_address(&self, address: &str) -> Result<(), ServerError> {
        if !self.is_initialized() {
            return Err(ServerError::NotInitialized);
        }
        let address = normalize_address(address)?;

        let removed = {
            let mut linked = self.linked.write();
            let before = linked.len();
            linked.retain(|a| *a != address);
            before != linked.len()
        };
        if !removed {
            return Err(ServerError::NotLinked(address));
        }

        self.base.emit(ServerEvent::AddressUnlinked { address });
        Ok(())
    }
}

#[async_trait]
impl Module for BackendServer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &[capability::BACKEND]
    }

    fn setup(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        config::register(ctx.config())?;
        Ok(())
    }

    async fn start(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let app_id = required(ctx, &APP_ID)?;
        let server_url = required(ctx, &SERVER_URL)?;
        let network = ctx.modules().find_network()?;
        debug!(network = network.name(), "Resolved network module");

        info!(%server_url, "Initializing backend server");
        self.session.store(Some(Arc::new(Session {
            app_id,
            server_url: server_url.clone(),
            network,
        })));

        self.base.emit(ServerEvent::Initialized { server_url });
        Ok(())
    }

    fn cleanup(&self) {
        self.base.cleanup();
    }
}

// Keys default to "", which only `start` can catch: `reset` bypasses validators.
fn required(ctx: &ModuleCtx, key: &chainkit::ConfigKey<String>) -> Result<String, ServerError> {
    let value = ctx.config().get(key)?;
    if value.trim().is_empty() {
        return Err(ServerError::MissingConfig(key.name()));
    }
    Ok(value)
}

fn normalize_address(address: &str) -> Result<String, ServerError> {
    match address.strip_prefix("0x") {
        Some(hex) if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
            Ok(address.to_ascii_lowercase())
        }
        _ => Err(ServerError::InvalidAddress(address.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_lowercased() {
        assert_eq!(
            normalize_address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap(),
            "0xd8da6bf26964af9d7eed9e03e53415d37aa96045"
        );
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        for bad in ["", "0x", "d8dA6BF26964aF9D7eEd9e03E53415D37aA96045", "0x1234", "0xzz"] {
            assert!(
                matches!(normalize_address(bad), Err(ServerError::InvalidAddress(_))),
                "{bad} should be rejected"
            );
        }
    }
}
