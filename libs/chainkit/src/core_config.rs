//! Config keys owned by the core itself. Registered when a [`crate::Core`] is created.

use serde::{Deserialize, Serialize};

use crate::config::{validators, Config, ConfigKey};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildEnvironment {
    Browser,
    Node,
    ReactNative,
}

pub const LOG_LEVEL: ConfigKey<LogLevel> = ConfigKey::new("logLevel", || LogLevel::Info);

pub const BUILD_ENVIRONMENT: ConfigKey<BuildEnvironment> =
    ConfigKey::new("buildEnvironment", || BuildEnvironment::Node);

pub const DEFAULT_NETWORK: ConfigKey<String> =
    ConfigKey::new("defaultNetwork", || "evm".to_string());

pub const PRODUCT: ConfigKey<Option<String>> = ConfigKey::new("product", || None);

pub(crate) fn register(config: &Config) -> Result<(), ConfigError> {
    config.register_key(&LOG_LEVEL)?;
    config.register_key(&BUILD_ENVIRONMENT)?;
    config.register_key_with(&DEFAULT_NETWORK, validators::not_empty)?;
    config.register_key(&PRODUCT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn core_keys_have_defaults() {
        let config = Config::new();
        register(&config).unwrap();

        assert_eq!(config.get(&LOG_LEVEL).unwrap(), LogLevel::Info);
        assert_eq!(config.get(&BUILD_ENVIRONMENT).unwrap(), BuildEnvironment::Node);
        assert_eq!(config.get(&DEFAULT_NETWORK).unwrap(), "evm");
        assert_eq!(config.get(&PRODUCT).unwrap(), None);
    }

    #[test]
    fn enum_keys_accept_their_wire_names() {
        let config = Config::new();
        register(&config).unwrap();

        config
            .merge([
                ("logLevel", json!("warning")),
                ("buildEnvironment", json!("react-native")),
                ("product", json!("sdk")),
            ])
            .unwrap();

        assert_eq!(config.get(&LOG_LEVEL).unwrap(), LogLevel::Warning);
        assert_eq!(
            config.get(&BUILD_ENVIRONMENT).unwrap(),
            BuildEnvironment::ReactNative
        );
        assert_eq!(config.get(&PRODUCT).unwrap().as_deref(), Some("sdk"));
        assert!(config.set_raw("logLevel", json!("loud")).is_err());
    }

    #[test]
    fn log_levels_are_ordered_by_severity() {
        assert!(LogLevel::Verbose < LogLevel::Debug);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Off);
    }
}
