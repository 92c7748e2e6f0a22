// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capability handle a plugin uses to reach the host.
//!
//! A [`PluginContext`] lives exactly as long as the plugin's runtime record.
//! It exposes the merged configuration, a private data directory, a private
//! name-keyed service registry, and read access to host services.

use std::any::{Any, TypeId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::services::HostServices;

/// Why a per-plugin service lookup produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceLookupError {
    #[error("no service registered under `{0}`")]
    NotFound(String),
    #[error("service `{0}` has a different type")]
    TypeMismatch(String),
}

/// Severity for messages a plugin forwards to host logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Per-plugin capability handle.
pub struct PluginContext {
    plugin_id: String,
    configuration: Map<String, Value>,
    data_directory: PathBuf,
    services: DashMap<String, Arc<dyn Any + Send + Sync>>,
    host: Arc<dyn HostServices>,
}

impl PluginContext {
    /// Create a context with an already merged configuration.
    pub fn new(
        plugin_id: impl Into<String>,
        configuration: Map<String, Value>,
        data_directory: PathBuf,
        host: Arc<dyn HostServices>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            configuration,
            data_directory,
            services: DashMap::new(),
            host,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// The merged configuration map.
    pub fn configuration(&self) -> &Map<String, Value> {
        &self.configuration
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).and_then(Value::as_str)
    }

    /// `<data-root>/<plugin-id>`. Not created until [`ensure_data_directory`](Self::ensure_data_directory).
    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    /// Create the data directory on demand and return it.
    pub fn ensure_data_directory(&self) -> std::io::Result<&Path> {
        std::fs::create_dir_all(&self.data_directory)?;
        Ok(&self.data_directory)
    }

    /// Register a service under `name`, returning the one it replaced.
    pub fn register_service<T: Any + Send + Sync>(
        &self,
        name: impl Into<String>,
        service: T,
    ) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.insert(name.into(), Arc::new(service))
    }

    /// Type-checked lookup of a service this plugin registered.
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ServiceLookupError> {
        let entry = self
            .services
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| ServiceLookupError::NotFound(name.to_string()))?;
        entry
            .downcast::<T>()
            .map_err(|_| ServiceLookupError::TypeMismatch(name.to_string()))
    }

    /// Untyped lookup, used by the host to query what a plugin exposes.
    pub fn raw_service(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Names of every registered service, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Drop every plugin-registered service. Called by the runtime on unload,
    /// while the plugin's code is still mapped.
    pub fn clear_services(&self) {
        self.services.clear();
    }

    /// A service shared by the host, looked up by type.
    pub fn bean<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.host.lookup(TypeId::of::<T>())?.downcast::<T>().ok()
    }

    pub fn environment(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    pub fn environment_or(&self, key: &str, default: &str) -> String {
        self.environment(key).unwrap_or_else(|| default.to_string())
    }

    /// Forward a plugin message to host logging, tagged with the plugin id.
    pub fn log(&self, level: LogLevel, message: &str, error: Option<&dyn std::error::Error>) {
        let plugin_id = self.plugin_id.as_str();
        let error = error.map(|e| e.to_string());
        let error = error.as_deref();
        match level {
            LogLevel::Trace => tracing::trace!(plugin_id, error, "{message}"),
            LogLevel::Debug => tracing::debug!(plugin_id, error, "{message}"),
            LogLevel::Info => tracing::info!(plugin_id, error, "{message}"),
            LogLevel::Warn => tracing::warn!(plugin_id, error, "{message}"),
            LogLevel::Error => tracing::error!(plugin_id, error, "{message}"),
        }
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("configuration", &self.configuration)
            .field("data_directory", &self.data_directory)
            .field("services", &self.service_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceRegistry;
    use serde_json::json;
    use tracing_test::traced_test;

    fn context_with(host: Arc<ServiceRegistry>) -> PluginContext {
        let mut config = Map::new();
        config.insert("currency".into(), json!("EUR"));
        config.insert("retries".into(), json!(3));
        PluginContext::new(
            "billing",
            config,
            std::env::temp_dir().join("warden-context-test").join("billing"),
            host,
        )
    }

    #[test]
    fn configuration_accessors() {
        let ctx = context_with(Arc::new(ServiceRegistry::new()));
        assert_eq!(ctx.plugin_id(), "billing");
        assert_eq!(ctx.config_str("currency"), Some("EUR"));
        assert_eq!(ctx.config_value("retries"), Some(&json!(3)));
        assert_eq!(ctx.config_str("retries"), None);
        assert!(ctx.config_value("missing").is_none());
        assert!(ctx.data_directory().ends_with("billing"));
    }

    #[test]
    fn service_registry_is_type_checked() {
        let ctx = context_with(Arc::new(ServiceRegistry::new()));
        assert!(ctx.register_service("rate", 19u32).is_none());

        assert_eq!(*ctx.service::<u32>("rate").unwrap(), 19);
        assert_eq!(
            ctx.service::<String>("rate").unwrap_err(),
            ServiceLookupError::TypeMismatch("rate".into())
        );
        assert_eq!(
            ctx.service::<u32>("nope").unwrap_err(),
            ServiceLookupError::NotFound("nope".into())
        );

        assert!(ctx.register_service("rate", 20u32).is_some());
        assert_eq!(ctx.service_names(), vec!["rate".to_string()]);
        assert!(ctx.raw_service("rate").is_some());

        ctx.clear_services();
        assert!(ctx.service_names().is_empty());
    }

    #[test]
    fn bean_reads_host_services() {
        let host = Arc::new(ServiceRegistry::new());
        host.provide(Arc::new(String::from("shared-signing-key")));
        let ctx = context_with(host);

        assert_eq!(ctx.bean::<String>().unwrap().as_str(), "shared-signing-key");
        assert!(ctx.bean::<u64>().is_none());
    }

    #[test]
    #[serial_test::serial]
    fn environment_lookup_with_default() {
        let ctx = context_with(Arc::new(ServiceRegistry::new()));
        // SAFETY: serialized test, no other thread reads this variable.
        unsafe { std::env::set_var("WARDEN_CONTEXT_TEST_VAR", "on") };
        assert_eq!(ctx.environment("WARDEN_CONTEXT_TEST_VAR").as_deref(), Some("on"));
        // SAFETY: as above.
        unsafe { std::env::remove_var("WARDEN_CONTEXT_TEST_VAR") };
        assert_eq!(ctx.environment_or("WARDEN_CONTEXT_TEST_VAR", "off"), "off");
    }

    #[test]
    fn ensure_data_directory_creates_it() {
        let ctx = context_with(Arc::new(ServiceRegistry::new()));
        let dir = ctx.ensure_data_directory().unwrap().to_path_buf();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    #[traced_test]
    fn log_forwards_with_plugin_id() {
        let ctx = context_with(Arc::new(ServiceRegistry::new()));
        let err = std::io::Error::other("disk full");
        ctx.log(LogLevel::Warn, "export failed", Some(&err));
        ctx.log(LogLevel::Trace, "quiet", None);
        assert!(logs_contain("export failed"));
        assert!(logs_contain("billing"));
    }
}
