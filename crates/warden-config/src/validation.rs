// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::WardenConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration. Collects every failure instead of
/// stopping at the first.
pub fn validate_config(config: &WardenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(validation("server.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(validation(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if let Some(token) = &config.server.admin_token
        && token.trim().is_empty()
    {
        errors.push(validation(
            "server.admin_token must not be blank; remove it to disable admin auth",
        ));
    }

    if config.plugins.directory.trim().is_empty() {
        errors.push(validation("plugins.directory must not be empty"));
    }

    if config.plugins.data_directory.trim().is_empty() {
        errors.push(validation("plugins.data_directory must not be empty"));
    }

    let ext = &config.plugins.artifact_extension;
    if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
        errors.push(validation(format!(
            "plugins.artifact_extension `{ext}` must be a bare extension such as `zip`"
        )));
    }

    let mut override_ids: Vec<&String> = config.plugins.overrides.keys().collect();
    override_ids.sort();
    for id in override_ids {
        if !is_valid_plugin_id(id) {
            errors.push(validation(format!(
                "plugins.overrides key `{id}` is not a valid plugin id"
            )));
        }
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(validation(format!(
            "logging.level `{}` must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

/// Plugin ids are path-safe: `[A-Za-z0-9._-]+`, never `.` or `..`.
pub fn is_valid_plugin_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&WardenConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = WardenConfig::default();
        config.server.host = String::new();
        config.plugins.directory = " ".to_string();
        config.logging.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn plugin_id_rules() {
        assert!(is_valid_plugin_id("billing-v2.1_x"));
        assert!(!is_valid_plugin_id(".."));
        assert!(!is_valid_plugin_id("a/b"));
        assert!(!is_valid_plugin_id(""));
    }
}
