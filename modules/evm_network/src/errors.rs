use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    #[error("not connected to an EVM network")]
    NotConnected,

    #[error("invalid chain id '{0}': expected a 0x-prefixed hex string")]
    InvalidChain(String),

    #[error("invalid account '{0}': expected a 0x-prefixed 20-byte hex address")]
    InvalidAccount(String),

    #[error(transparent)]
    Config(#[from] chainkit::ConfigError),
}
