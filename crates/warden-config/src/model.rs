// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Warden plugin host.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a typo in
//! `warden.toml` fails loudly instead of being ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Plugin runtime settings.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings for the admin API and plugin routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required by `/admin` routes. Admin routes are open when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8480
}

/// Plugin runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Directory scanned for plugin artifacts.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,

    /// Root under which each plugin gets `<data_directory>/<plugin_id>`.
    #[serde(default = "default_data_directory")]
    pub data_directory: String,

    /// Load every artifact in `directory` at startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,

    /// File extension of plugin artifacts, without the dot.
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    /// Fail a load when any of its routes cannot be registered.
    #[serde(default)]
    pub strict_routes: bool,

    /// Per-plugin configuration that overrides the descriptor's values.
    #[serde(default)]
    pub overrides: HashMap<String, Map<String, Value>>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            data_directory: default_data_directory(),
            auto_load: true,
            artifact_extension: default_artifact_extension(),
            strict_routes: false,
            overrides: HashMap::new(),
        }
    }
}

fn default_plugin_directory() -> String {
    "plugins".to_string()
}

fn default_data_directory() -> String {
    "plugin-data".to_string()
}

fn default_artifact_extension() -> String {
    "zip".to_string()
}

fn default_true() -> bool {
    true
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level for the `warden` crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
