use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is not initialized; start the core first")]
    NotInitialized,

    #[error("config key '{0}' must be set before the server starts")]
    MissingConfig(&'static str),

    #[error("invalid address '{0}': expected a 0x-prefixed 20-byte hex address")]
    InvalidAddress(String),

    #[error("address '{0}' is not linked")]
    NotLinked(String),

    #[error("network module is not connected")]
    NotConnected,

    #[error("signing failed")]
    Network(#[source] anyhow::Error),

    #[error(transparent)]
    Config(#[from] chainkit::ConfigError),
}
