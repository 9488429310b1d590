//! Typed, validated configuration registry shared by every module of a core.
//!
//! Keys are `const` identities carrying their value type, so a module's config
//! surface is checked at compile time by its consumers:
//!
//! ```rust,ignore
//! pub const APP_ID: ConfigKey<String> = ConfigKey::new("appId", String::new);
//!
//! config.register_key_with(&APP_ID, validators::not_empty)?;
//! config.set(&APP_ID, "my-app".to_string())?;
//! assert_eq!(config.get(&APP_ID)?, "my-app");
//! ```
//!
//! Internally the registry is keyed by name, which is what the untyped paths
//! (`get_raw`, `set_raw`, `merge`) use.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ConfigError;

/// Bound for anything that can be stored in the registry.
pub trait ConfigValue:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> ConfigValue for T where
    T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Untyped name → value mapping accepted by [`Config::merge`].
pub type ConfigValues = serde_json::Map<String, serde_json::Value>;

/// Returns `Some(description)` when the candidate value is rejected.
pub type Validator<V> = Arc<dyn Fn(&V) -> Option<String> + Send + Sync>;

/// A decoded, validated value ready to be committed to its item.
type Staged = Box<dyn Any + Send>;

/// Typed identity of one configuration value.
pub struct ConfigKey<V> {
    name: &'static str,
    default: fn() -> V,
}

impl<V> ConfigKey<V> {
    pub const fn new(name: &'static str, default: fn() -> V) -> Self {
        Self { name, default }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> V {
        (self.default)()
    }
}

impl<V> Clone for ConfigKey<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ConfigKey<V> {}

impl<V> fmt::Debug for ConfigKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigKey")
            .field("name", &self.name)
            .field("type", &type_name::<V>())
            .finish()
    }
}

struct ConfigItem<V: ConfigValue> {
    key: ConfigKey<V>,
    value: V,
    validator: Option<Validator<V>>,
}

// Runs without the registry lock held, so validators may read the registry.
fn check<V>(key: &str, validator: Option<&Validator<V>>, candidate: &V) -> Result<(), ConfigError> {
    match validator.and_then(|v| v(candidate)) {
        Some(reason) if !reason.is_empty() => Err(ConfigError::InvalidConfigValue {
            key: key.to_string(),
            reason,
        }),
        _ => Ok(()),
    }
}

/// Object-safe view of a `ConfigItem<V>` used by the name-keyed store.
trait ErasedItem: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn value_type(&self) -> &'static str;
    fn to_json(&self) -> Result<serde_json::Value, ConfigError>;
    /// A closure decoding and validating a candidate, run after the lock is released.
    fn stage(&self) -> Box<dyn FnOnce(serde_json::Value) -> Result<Staged, ConfigError> + Send>;
    fn commit(&mut self, staged: Staged) -> Result<(), ConfigError>;
    fn reset(&mut self);
}

impl<V: ConfigValue> ErasedItem for ConfigItem<V> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn value_type(&self) -> &'static str {
        type_name::<V>()
    }

    fn to_json(&self) -> Result<serde_json::Value, ConfigError> {
        serde_json::to_value(&self.value).map_err(|e| ConfigError::InvalidConfigValue {
            key: self.key.name.to_string(),
            reason: e.to_string(),
        })
    }

    fn stage(&self) -> Box<dyn FnOnce(serde_json::Value) -> Result<Staged, ConfigError> + Send> {
        let key = self.key.name;
        let validator = self.validator.clone();
        Box::new(move |value: serde_json::Value| -> Result<Staged, ConfigError> {
            let candidate: V =
                serde_json::from_value(value).map_err(|e| ConfigError::InvalidConfigValue {
                    key: key.to_string(),
                    reason: format!("expected {}: {e}", type_name::<V>()),
                })?;
            check(key, validator.as_ref(), &candidate)?;
            Ok(Box::new(candidate) as Staged)
        })
    }

    fn commit(&mut self, staged: Staged) -> Result<(), ConfigError> {
        // The key may have been re-registered with another type meanwhile.
        let value = staged
            .downcast::<V>()
            .map_err(|_| ConfigError::TypeMismatch {
                key: self.key.name.to_string(),
                expected: type_name::<V>(),
                found: "a value staged for a previous registration",
            })?;
        self.value = *value;
        Ok(())
    }

    fn reset(&mut self) {
        self.value = self.key.default_value();
    }
}

#[derive(Default)]
struct Items {
    order: Vec<&'static str>,
    by_name: HashMap<&'static str, Box<dyn ErasedItem>>,
}

impl Items {
    fn item(&self, name: &str) -> Result<&dyn ErasedItem, ConfigError> {
        self.by_name
            .get(name)
            .map(|b| &**b)
            .ok_or_else(|| ConfigError::KeyNotRegistered {
                key: name.to_string(),
            })
    }

    fn item_mut(&mut self, name: &str) -> Result<&mut Box<dyn ErasedItem>, ConfigError> {
        self.by_name
            .get_mut(name)
            .ok_or_else(|| ConfigError::KeyNotRegistered {
                key: name.to_string(),
            })
    }
}

// The one place where the name-keyed store is cast back to a typed item.
fn typed<'a, V: ConfigValue>(
    name: &str,
    item: &'a dyn ErasedItem,
) -> Result<&'a ConfigItem<V>, ConfigError> {
    item.as_any()
        .downcast_ref::<ConfigItem<V>>()
        .ok_or_else(|| ConfigError::TypeMismatch {
            key: name.to_string(),
            expected: type_name::<V>(),
            found: item.value_type(),
        })
}

fn typed_mut<'a, V: ConfigValue>(
    name: &str,
    item: &'a mut dyn ErasedItem,
) -> Result<&'a mut ConfigItem<V>, ConfigError> {
    let found = item.value_type();
    item.as_any_mut()
        .downcast_mut::<ConfigItem<V>>()
        .ok_or_else(|| ConfigError::TypeMismatch {
            key: name.to_string(),
            expected: type_name::<V>(),
            found,
        })
}

/// Name-keyed registry of typed configuration values.
#[derive(Default)]
pub struct Config {
    items: RwLock<Items>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("keys", &self.items.read().order)
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key without validation.
    pub fn register_key<V: ConfigValue>(&self, key: &ConfigKey<V>) -> Result<(), ConfigError> {
        self.insert(key, None)
    }

    /// Register a key whose values must pass `validator` on every `set`.
    ///
    /// The validator runs outside the registry lock and may read other keys.
    pub fn register_key_with<V, F>(&self, key: &ConfigKey<V>, validator: F) -> Result<(), ConfigError>
    where
        V: ConfigValue,
        F: Fn(&V) -> Option<String> + Send + Sync + 'static,
    {
        self.insert(key, Some(Arc::new(validator)))
    }

    fn insert<V: ConfigValue>(
        &self,
        key: &ConfigKey<V>,
        validator: Option<Validator<V>>,
    ) -> Result<(), ConfigError> {
        let mut items = self.items.write();
        if items.by_name.contains_key(key.name) {
            return Err(ConfigError::KeyAlreadyExists {
                key: key.name.to_string(),
            });
        }
        let item = ConfigItem {
            key: *key,
            value: key.default_value(),
            validator,
        };
        items.order.push(key.name);
        items.by_name.insert(key.name, Box::new(item));
        tracing::debug!(key = key.name, "Config key registered");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.read().by_name.contains_key(name)
    }

    /// Registered key names, in registration order.
    pub fn get_keys(&self) -> Vec<&'static str> {
        self.items.read().order.clone()
    }

    pub fn get<V: ConfigValue>(&self, key: &ConfigKey<V>) -> Result<V, ConfigError> {
        self.get_named(key.name)
    }

    pub fn get_named<V: ConfigValue>(&self, name: &str) -> Result<V, ConfigError> {
        let items = self.items.read();
        let item = items.item(name)?;
        Ok(typed::<V>(name, item)?.value.clone())
    }

    /// Current value as JSON, for callers without the typed key at hand.
    pub fn get_raw(&self, name: &str) -> Result<serde_json::Value, ConfigError> {
        self.items.read().item(name)?.to_json()
    }

    /// Validate `value` and commit it. On failure the stored value is untouched.
    pub fn set<V: ConfigValue>(&self, key: &ConfigKey<V>, value: V) -> Result<(), ConfigError> {
        self.set_named(key.name, value)
    }

    pub fn set_named<V: ConfigValue>(&self, name: &str, value: V) -> Result<(), ConfigError> {
        let validator = {
            let items = self.items.read();
            typed::<V>(name, items.item(name)?)?.validator.clone()
        };
        check(name, validator.as_ref(), &value)?;

        let mut items = self.items.write();
        let item = items.item_mut(name)?;
        typed_mut::<V>(name, &mut **item)?.value = value;
        tracing::trace!(key = name, "Config value set");
        Ok(())
    }

    /// Deserialize `value` into the key's type, validate it and commit it.
    pub fn set_raw(&self, name: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        let stage = self.items.read().item(name)?.stage();
        let staged = stage(value)?;

        self.items.write().item_mut(name)?.commit(staged)?;
        tracing::trace!(key = name, "Config value set");
        Ok(())
    }

    /// Apply `set_raw` for every pair, in iteration order.
    ///
    /// Not transactional: the first failure aborts the merge and the values
    /// applied before it stay committed.
    pub fn merge<I, K>(&self, values: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: AsRef<str>,
    {
        for (name, value) in values {
            self.set_raw(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Restore every key to its default. Validators are not consulted.
    pub fn reset(&self) {
        let mut items = self.items.write();
        for item in items.by_name.values_mut() {
            item.reset();
        }
        tracing::debug!(keys = items.order.len(), "Config reset to defaults");
    }

    /// Current values of all keys as JSON, in registration order.
    pub fn snapshot(&self) -> Result<Vec<(&'static str, serde_json::Value)>, ConfigError> {
        let items = self.items.read();
        items
            .order
            .iter()
            .map(|name| -> Result<_, ConfigError> { Ok((*name, items.item(name)?.to_json()?)) })
            .collect()
    }

    pub(crate) fn key_count(&self) -> usize {
        self.items.read().order.len()
    }

    /// Drop every key registered after the first `len` ones.
    pub(crate) fn truncate_keys(&self, len: usize) {
        let mut items = self.items.write();
        if len >= items.order.len() {
            return;
        }
        let removed = items.order.split_off(len);
        for name in &removed {
            items.by_name.remove(name);
        }
        tracing::debug!(keys = ?removed, "Config keys rolled back");
    }
}

/// Ready-made validators.
pub mod validators {
    /// Rejects empty (or whitespace-only) strings.
    #[allow(clippy::ptr_arg)]
    pub fn not_empty(value: &String) -> Option<String> {
        if value.trim().is_empty() {
            Some("value must not be empty".to_string())
        } else {
            None
        }
    }

    /// Accepts `0x`-prefixed hexadecimal strings with at least one digit.
    #[allow(clippy::ptr_arg)]
    pub fn hex_string(value: &String) -> Option<String> {
        match value.strip_prefix("0x") {
            Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
                None
            }
            _ => Some(format!("'{value}' is not a 0x-prefixed hex string")),
        }
    }
}
