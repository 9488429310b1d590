use std::sync::Arc;

use async_trait::async_trait;
use chainkit::{
    capability, validators, Core, Disposer, Module, ModuleBase, ModuleCtx, ModuleLogger,
    NetworkModule,
};
use parking_lot::RwLock;
use tracing::info;

use crate::config::{self, DEFAULT_EVM_CHAIN, EVM_AUTO_CONNECT};
use crate::errors::EvmError;
use crate::events::{EvmEvent, EvmEventKind};

/// Account reported by the in-memory connector.
pub const MOCK_ACCOUNT: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub account: String,
    pub chain: String,
}

/// EVM network adapter, `network` capability.
///
/// Connections are simulated in memory; nothing leaves the process.
pub struct EvmNetwork {
    base: ModuleBase<EvmEvent>,
    connection: RwLock<Option<Connection>>,
}

chainkit::submit_module!(name = EvmNetwork::NAME, deps = [], factory = EvmNetwork::create);

impl EvmNetwork {
    pub const NAME: &'static str = "evm";

    pub fn create(core: &Core) -> Arc<Self> {
        Arc::new(Self {
            base: ModuleBase::new(Self::NAME, core.config().clone()),
            connection: RwLock::new(None),
        })
    }

    pub fn logger(&self) -> &ModuleLogger {
        self.base.logger()
    }

    pub fn listen<F>(&self, kind: EvmEventKind, handler: F) -> Disposer<EvmEvent>
    where
        F: Fn(&EvmEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.base.listen(kind, handler)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    pub fn connection(&self) -> Option<Connection> {
        self.connection.read().clone()
    }

    /// Connect the mock account to `chain`, or to `defaultEvmChain` when `None`.
    ///
    /// Emits `Connecting` then `Connected`. Connecting while connected switches
    /// the chain.
    pub fn connect(&self, chain: Option<&str>) -> Result<Connection, EvmError> {
        let chain = match chain {
            Some(c) => c.to_string(),
            None => self.base.config().get(&DEFAULT_EVM_CHAIN)?,
        };
        if validators::hex_string(&chain).is_some() {
            return Err(EvmError::InvalidChain(chain));
        }

        self.base.logger().verbose(format_args!("Connecting to chain {chain}"));
        self.base.emit(EvmEvent::Connecting {
            chain: chain.clone(),
        });

        let connection = Connection {
            account: MOCK_ACCOUNT.to_string(),
            chain,
        };
        *self.connection.write() = Some(connection.clone());

        self.base.emit(EvmEvent::Connected {
            account: connection.account.clone(),
            chain: connection.chain.clone(),
        });
        Ok(connection)
    }

    /// Returns `false` if there was no connection.
    pub fn disconnect(&self) -> bool {
        let was_connected = self.connection.write().take().is_some();
        if was_connected {
            self.base.emit(EvmEvent::Disconnected);
        }
        was_connected
    }

    /// Deterministic mock signature over the connected account and `message`.
    pub fn sign_message(&self, message: &str) -> Result<String, EvmError> {
        let connection = self.connection().ok_or(EvmError::NotConnected)?;
        Ok(mock_signature(&connection.account, message))
    }
}

#[async_trait]
impl Module for EvmNetwork {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &[capability::NETWORK]
    }

    fn setup(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        config::register(ctx.config())?;
        Ok(())
    }

    async fn start(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!(module = Self::NAME, "Starting EVM network module");
        self.base.emit(EvmEvent::Initialized);

        if ctx.config().get(&EVM_AUTO_CONNECT)? {
            let connection = self.connect(None)?;
            info!(chain = %connection.chain, "Auto-connected");
        }
        Ok(())
    }

    fn cleanup(&self) {
        self.base.cleanup();
    }

    fn as_network(self: Arc<Self>) -> Option<Arc<dyn NetworkModule>> {
        Some(self)
    }
}

impl NetworkModule for EvmNetwork {
    fn is_connected(&self) -> bool {
        EvmNetwork::is_connected(self)
    }

    fn sign_message(&self, message: &str) -> anyhow::Result<String> {
        Ok(EvmNetwork::sign_message(self, message)?)
    }
}

// 65-byte signature shape (r, s, v) built from FNV-1a over account and message.
fn mock_signature(account: &str, message: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut sig = String::with_capacity(2 + 130);
    sig.push_str("0x");
    let mut hash = FNV_OFFSET;
    for round in 0u8..8 {
        for byte in account
            .to_ascii_lowercase()
            .bytes()
            .chain([0u8, round])
            .chain(message.bytes())
        {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        sig.push_str(&format!("{hash:016x}"));
    }
    sig.push_str("1b");
    sig
}
