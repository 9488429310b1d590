use super::*;
use chainkit::{validators, ConfigKey};
use figment::Jail;
use serde_json::json;

const APP_ID: ConfigKey<String> = ConfigKey::new("appId", String::new);
const AUTO_CONNECT: ConfigKey<bool> = ConfigKey::new("evmAutoConnect", || false);

fn yaml_with_home(home: &Path, rest: &str) -> String {
    format!("host:\n  home_dir: \"{}\"\n{rest}", home.display())
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert!(config.host.home_dir.is_empty());
    assert!(config.values.is_empty());

    let logging = config.logging.as_ref().unwrap();
    let default = logging.get("default").unwrap();
    assert_eq!(default.console_level, "info");
    assert_eq!(default.file, "logs/chainkit.log");
}

#[test]
fn test_yaml_serialization() {
    let yaml = AppConfig::default().to_yaml().unwrap();
    assert!(yaml.contains("host:"));
    assert!(yaml.contains("logging:"));
    assert!(yaml.contains("values:"));
}

#[test]
fn test_layered_loading_yaml_only() {
    Jail::expect_with(|jail| {
        let home = jail.directory().join("home");
        jail.create_file(
            "chainkit.yaml",
            &yaml_with_home(
                &home,
                "values:\n  appId: \"abc\"\n  evmAutoConnect: true\n",
            ),
        )?;

        let config = AppConfig::load_layered(jail.directory().join("chainkit.yaml"))
            .map_err(|e| e.to_string())?;

        assert_eq!(config.home_dir(), home);
        assert!(home.is_dir(), "home_dir is created on load");
        assert!(config.logging.is_none());
        assert_eq!(config.values.get("appId"), Some(&json!("abc")));
        assert_eq!(config.values.get("evmAutoConnect"), Some(&json!(true)));
        Ok(())
    });
}

#[test]
fn test_env_overrides_yaml() {
    Jail::expect_with(|jail| {
        let from_file = jail.directory().join("from-file");
        let from_env = jail.directory().join("from-env");
        jail.create_file("chainkit.yaml", &yaml_with_home(&from_file, ""))?;
        jail.set_env("CHAINKIT__HOST__HOME_DIR", from_env.display());

        let config = AppConfig::load_layered(jail.directory().join("chainkit.yaml"))
            .map_err(|e| e.to_string())?;

        assert_eq!(config.home_dir(), from_env);
        Ok(())
    });
}

#[test]
fn test_logging_section_from_yaml() {
    Jail::expect_with(|jail| {
        let home = jail.directory().join("home");
        jail.create_file(
            "chainkit.yaml",
            &yaml_with_home(
                &home,
                "logging:\n  default:\n    console_level: warn\n  evm_network:\n    console_level: debug\n    file: logs/evm.log\n",
            ),
        )?;

        let config = AppConfig::load_layered(jail.directory().join("chainkit.yaml"))
            .map_err(|e| e.to_string())?;

        let logging = config.logging.unwrap();
        assert_eq!(logging["default"].console_level, "warn");
        assert!(logging["default"].file.is_empty());
        assert_eq!(logging["evm_network"].file, "logs/evm.log");
        Ok(())
    });
}

#[test]
fn test_missing_file_is_an_error() {
    Jail::expect_with(|jail| {
        let err = AppConfig::load_layered(jail.directory().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
        Ok(())
    });
}

#[test]
fn test_unknown_section_is_rejected() {
    Jail::expect_with(|jail| {
        let home = jail.directory().join("home");
        jail.create_file(
            "chainkit.yaml",
            &yaml_with_home(&home, "server:\n  port: 8080\n"),
        )?;

        assert!(AppConfig::load_layered(jail.directory().join("chainkit.yaml")).is_err());
        Ok(())
    });
}

#[test]
fn test_relative_home_dir_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("chainkit.yaml", "host:\n  home_dir: relative/home\n")?;

        let err = AppConfig::load_layered(jail.directory().join("chainkit.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("absolute"));
        Ok(())
    });
}

#[test]
fn test_cli_verbose_overrides_console_level() {
    let mut config = AppConfig::default();
    config.apply_cli_overrides(&CliArgs {
        verbose: 1,
        ..CliArgs::default()
    });
    assert_eq!(
        config.logging.as_ref().unwrap()["default"].console_level,
        "debug"
    );

    config.apply_cli_overrides(&CliArgs {
        verbose: 3,
        ..CliArgs::default()
    });
    assert_eq!(
        config.logging.as_ref().unwrap()["default"].console_level,
        "trace"
    );
}

#[test]
fn test_cli_without_verbose_keeps_logging() {
    let mut config = AppConfig {
        logging: None,
        ..AppConfig::default()
    };
    config.apply_cli_overrides(&CliArgs::default());
    assert!(config.logging.is_none());
}

#[test]
fn test_apply_values_into_registry() {
    let registry = Config::new();
    registry
        .register_key_with(&APP_ID, validators::not_empty)
        .unwrap();
    registry.register_key(&AUTO_CONNECT).unwrap();

    let mut config = AppConfig::default();
    config.values.insert("appId".into(), json!("abc"));
    config.values.insert("evmAutoConnect".into(), json!(true));

    config.apply_values(&registry).unwrap();
    assert_eq!(registry.get(&APP_ID).unwrap(), "abc");
    assert!(registry.get(&AUTO_CONNECT).unwrap());
}

#[test]
fn test_apply_values_reports_unregistered_and_invalid_keys() {
    let registry = Config::new();
    registry
        .register_key_with(&APP_ID, validators::not_empty)
        .unwrap();

    let mut config = AppConfig::default();
    config.values.insert("appId".into(), json!(""));
    assert!(matches!(
        config.apply_values(&registry),
        Err(ConfigError::InvalidConfigValue { ref key, .. }) if key == "appId"
    ));

    config.values.clear();
    config.values.insert("serverUrl".into(), json!("https://x"));
    assert!(matches!(
        config.apply_values(&registry),
        Err(ConfigError::KeyNotRegistered { ref key }) if key == "serverUrl"
    ));
}

#[test]
fn test_apply_values_runs_in_key_order() {
    const RETRIES: ConfigKey<u32> = ConfigKey::new("zRetries", || 3);

    let registry = Config::new();
    registry
        .register_key_with(&APP_ID, validators::not_empty)
        .unwrap();
    registry.register_key(&RETRIES).unwrap();

    let mut config = AppConfig::default();
    config.values.insert("zRetries".into(), json!(9));
    config.values.insert("appId".into(), json!(""));

    assert!(config.apply_values(&registry).is_err());
    // "appId" sorts first and fails, so "zRetries" is never applied.
    assert_eq!(registry.get(&RETRIES).unwrap(), 3);
}
