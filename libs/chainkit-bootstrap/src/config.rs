use anyhow::{Context, Result};
use chainkit::{Config, ConfigError, ConfigValues};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::resolve_home_dir;

/// Environment prefix for overrides, e.g. `CHAINKIT__HOST__HOME_DIR=/srv/chainkit`.
pub const ENV_PREFIX: &str = "CHAINKIT__";

const DEFAULT_SUBDIR: &str = ".chainkit";

/// Host application configuration: a typed host section, logging, and the
/// untyped `values` bag merged into the core config registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Key name → value, applied with [`Config::merge`] once modules are set up.
    #[serde(default)]
    pub values: ConfigValues,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Normalized to an absolute path on load; empty means `$HOME/.chainkit`.
    #[serde(default)]
    pub home_dir: String,
}

/// Logging configuration keyed by target prefix.
/// Key "default" is the catch-all for targets without their own section.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "trace" | "debug" | "info" | "warn" | "error" | "off"
    #[serde(default)]
    pub file: String, // relative to home_dir unless absolute
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/chainkit.log".to_string(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            logging: Some(default_logging_config()),
            values: ConfigValues::new(),
        }
    }
}

/// Command line arguments that feed into the configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

impl AppConfig {
    /// Layered loading: defaults → YAML file → `CHAINKIT__*` environment.
    /// Also normalizes `host.home_dir` into an absolute path and creates it.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }

        // Logging stays None unless the file or the environment provides it.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        normalize_home_dir_inplace(&mut config.host).context("Failed to resolve host.home_dir")?;
        Ok(config)
    }

    /// Load from `config_path` if given, otherwise start from defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.host)
                    .context("Failed to resolve host.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// `-v` raises the default console level to debug, `-vv` to trace.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.verbose == 0 {
            return;
        }
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                1 => "debug",
                _ => "trace",
            }
            .to_string();
        }
    }

    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(&self.host.home_dir)
    }

    /// Merge the `values` section into `config`.
    ///
    /// Every key must already be registered by a module. Keys are applied in
    /// name order, not in the order they appear in the YAML file: the layered
    /// loader does not keep document order. Stops at the first failing key;
    /// values applied before it stay set.
    pub fn apply_values(&self, config: &Config) -> Result<(), ConfigError> {
        let mut values: Vec<_> = self.values.iter().collect();
        values.sort_by(|a, b| a.0.cmp(b.0));
        config.merge(values.into_iter().map(|(k, v)| (k, v.clone())))
    }
}

fn normalize_home_dir_inplace(host: &mut HostConfig) -> Result<()> {
    let opt = if host.home_dir.trim().is_empty() {
        None
    } else {
        Some(host.home_dir.clone())
    };

    let resolved = resolve_home_dir(opt, DEFAULT_SUBDIR, /*create*/ true)
        .context("home_dir normalization failed")?;
    host.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

#[cfg(test)]
mod tests;
