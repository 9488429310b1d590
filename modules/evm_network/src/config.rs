use chainkit::{validators, Config, ConfigError, ConfigKey};

/// Chain used by `connect` when none is given.
pub const DEFAULT_EVM_CHAIN: ConfigKey<String> =
    ConfigKey::new("defaultEvmChain", || "0x1".to_string());

/// Connect during `start`.
pub const EVM_AUTO_CONNECT: ConfigKey<bool> = ConfigKey::new("evmAutoConnect", || false);

pub(crate) fn register(config: &Config) -> Result<(), ConfigError> {
    config.register_key_with(&DEFAULT_EVM_CHAIN, validators::hex_string)?;
    config.register_key(&EVM_AUTO_CONNECT)?;
    Ok(())
}
