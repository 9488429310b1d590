use chainkit::{validators, Config, ConfigError, ConfigKey};

pub const APP_ID: ConfigKey<String> = ConfigKey::new("appId", String::new);

pub const SERVER_URL: ConfigKey<String> = ConfigKey::new("serverUrl", String::new);

#[allow(clippy::ptr_arg)]
fn http_url(value: &String) -> Option<String> {
    if let Some(reason) = validators::not_empty(value) {
        return Some(reason);
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        None
    } else {
        Some(format!("'{value}' must start with http:// or https://"))
    }
}

pub(crate) fn register(config: &Config) -> Result<(), ConfigError> {
    config.register_key_with(&APP_ID, validators::not_empty)?;
    config.register_key_with(&SERVER_URL, http_url)?;
    Ok(())
}
