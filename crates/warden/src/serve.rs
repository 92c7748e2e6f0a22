// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `warden serve`: load plugins and run the gateway until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use warden_config::WardenConfig;
use warden_core::WardenError;
use warden_gateway::{AuthConfig, GatewayState, LiveRouter, ServerConfig, start_server};
use warden_plugin::{PluginManager, PluginManagerConfig};

/// Runtime settings of the plugin manager from the `[plugins]` section.
pub fn manager_config(config: &WardenConfig) -> PluginManagerConfig {
    let plugins = &config.plugins;
    PluginManagerConfig {
        plugin_directory: PathBuf::from(&plugins.directory),
        data_directory: PathBuf::from(&plugins.data_directory),
        auto_load: plugins.auto_load,
        artifact_extension: plugins.artifact_extension.clone(),
        strict_routes: plugins.strict_routes,
        overrides: plugins.overrides.clone(),
    }
}

pub fn server_config(config: &WardenConfig) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        admin_token: config.server.admin_token.clone(),
    }
}

/// Run the host: load plugins, serve, unload everything on shutdown.
pub async fn run_serve(config: WardenConfig) -> Result<(), WardenError> {
    init_tracing(&config.logging.level);

    info!("starting warden serve");

    let router = Arc::new(LiveRouter::new());
    let manager = Arc::new(PluginManager::new(manager_config(&config), router.clone()));

    let loaded = {
        let manager = manager.clone();
        tokio::task::spawn_blocking(move || manager.initialize())
            .await
            .map_err(|e| WardenError::Internal(format!("plugin initialization task failed: {e}")))?
    };
    info!(loaded, routes = router.keys().len(), "plugins initialized");

    let state = GatewayState::new(
        manager.clone(),
        router,
        AuthConfig::new(config.server.admin_token.clone()),
    );
    let result = start_server(&server_config(&config), state, shutdown_signal()).await;

    let unloaded = tokio::task::spawn_blocking(move || manager.unload_all())
        .await
        .map_err(|e| WardenError::Internal(format!("plugin shutdown task failed: {e}")))?;
    info!(unloaded, "warden stopped");

    result
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warden={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_config_follows_plugins_section() {
        let config = warden_config::load_config_from_str(
            r#"
[server]
port = 9000
admin_token = "s3cret"

[plugins]
directory = "/srv/warden/plugins"
data_directory = "/srv/warden/data"
auto_load = false
artifact_extension = "wpa"
strict_routes = true

[plugins.overrides.billing]
currency = "EUR"
"#,
        )
        .unwrap();

        let manager = manager_config(&config);
        assert_eq!(manager.plugin_directory, PathBuf::from("/srv/warden/plugins"));
        assert_eq!(manager.data_directory, PathBuf::from("/srv/warden/data"));
        assert!(!manager.auto_load);
        assert_eq!(manager.artifact_extension, "wpa");
        assert!(manager.strict_routes);
        assert_eq!(manager.overrides["billing"]["currency"], "EUR");

        let server = server_config(&config);
        assert_eq!(server.port, 9000);
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.admin_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn default_config_maps_to_default_manager() {
        let config = warden_config::load_config_from_str("").unwrap();
        let manager = manager_config(&config);
        let defaults = PluginManagerConfig::default();
        assert_eq!(manager.plugin_directory, defaults.plugin_directory);
        assert_eq!(manager.data_directory, defaults.data_directory);
        assert_eq!(manager.auto_load, defaults.auto_load);
        assert_eq!(manager.artifact_extension, defaults.artifact_extension);
    }
}
