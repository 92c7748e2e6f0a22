// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin manager: owns the runtime registry and drives install, load,
//! unload, and reload.
//!
//! Operations run on the calling thread. Mutations of one plugin id are
//! serialized by a per-id lock; the registry itself is a concurrent map, so
//! different ids load and unload in parallel.
//!
//! A load is split in two phases. [`PluginManager::prepare`] does everything
//! that can fail without touching shared state (descriptor, validation,
//! module scope, instantiation). Activation then inserts the record, runs
//! `initialize`, and maps routes. Reload prepares the new artifact before
//! tearing the running instance down, so a broken artifact leaves the old
//! plugin in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use warden_core::{
    EndpointInfo, HostServices, Plugin, PluginContext, PluginState, PluginStore,
    RouteDispatcher, ServiceRegistry, WardenError,
};

use crate::context::build_context;
use crate::descriptor::{
    PluginDescriptor, is_valid_plugin_id, read_descriptor, read_descriptor_bytes,
};
use crate::endpoints::EndpointRegistry;
use crate::guard::guard;
use crate::scope::{HostScope, ModuleScope};

/// Version plugins' `host_version` requirements are checked against.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Artifact files directly inside `dir` with the given extension, sorted.
///
/// A missing directory yields an empty list.
pub fn scan_artifacts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, WardenError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "plugin directory does not exist");
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Log the outcome of a load attempt and flatten it to a flag.
fn report_load(path: &Path, result: Result<String, WardenError>) -> bool {
    match result {
        Ok(id) => {
            debug!(plugin_id = %id, "load_plugin succeeded");
            true
        }
        Err(WardenError::DuplicatePlugin(id)) => {
            warn!(plugin_id = %id, path = %path.display(), "plugin already loaded, ignoring");
            false
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load plugin");
            false
        }
    }
}

/// Runtime settings of the plugin manager.
#[derive(Debug, Clone)]
pub struct PluginManagerConfig {
    /// Where artifacts live when no store is configured.
    pub plugin_directory: PathBuf,
    /// Root of the per-plugin data directories.
    pub data_directory: PathBuf,
    /// Load every known artifact in [`PluginManager::initialize`].
    pub auto_load: bool,
    /// Artifact file extension, without the dot.
    pub artifact_extension: String,
    /// Treat a failed route registration as a failed load.
    pub strict_routes: bool,
    /// Host-level per-plugin configuration, merged over descriptor values.
    pub overrides: HashMap<String, Map<String, Value>>,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            plugin_directory: PathBuf::from("plugins"),
            data_directory: PathBuf::from("plugin-data"),
            auto_load: true,
            artifact_extension: "zip".to_string(),
            strict_routes: false,
            overrides: HashMap::new(),
        }
    }
}

/// Read-only view of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub entry_point: String,
    pub state: PluginState,
    pub artifact_path: PathBuf,
    pub data_directory: PathBuf,
    pub loaded_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub endpoint_count: usize,
}

/// An artifact that has been parsed, scoped, and instantiated but not yet
/// registered.
pub struct PreparedPlugin {
    // Dropped before `scope`: the instance's code lives in the scope.
    instance: Box<dyn Plugin>,
    descriptor: PluginDescriptor,
    artifact_path: PathBuf,
    scope: ModuleScope,
}

impl PreparedPlugin {
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }
}

impl std::fmt::Debug for PreparedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedPlugin")
            .field("descriptor", &self.descriptor)
            .field("artifact_path", &self.artifact_path)
            .finish()
    }
}

/// The live record of a loaded plugin. Field order is drop order.
struct PluginRecord {
    instance: Arc<dyn Plugin>,
    context: Arc<PluginContext>,
    descriptor: PluginDescriptor,
    artifact_path: PathBuf,
    state: PluginState,
    loaded_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    scope: ModuleScope,
}

impl PluginRecord {
    /// Drop everything created from the scope, then close it.
    fn release(self) {
        let PluginRecord {
            instance,
            context,
            scope,
            ..
        } = self;
        context.clear_services();
        drop(instance);
        drop(context);
        scope.close();
    }
}

/// Orchestrates plugin install, load, unload, and reload.
pub struct PluginManager {
    config: PluginManagerConfig,
    host_version: semver::Version,
    host_scope: Arc<HostScope>,
    services: Arc<dyn HostServices>,
    store: Option<Arc<dyn PluginStore>>,
    endpoints: EndpointRegistry,
    plugins: DashMap<String, PluginRecord>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginManager {
    pub fn new(config: PluginManagerConfig, dispatcher: Arc<dyn RouteDispatcher>) -> Self {
        Self {
            config,
            host_version: semver::Version::parse(HOST_VERSION)
                .unwrap_or_else(|_| semver::Version::new(0, 0, 0)),
            host_scope: Arc::new(HostScope::new()),
            services: Arc::new(ServiceRegistry::new()),
            store: None,
            endpoints: EndpointRegistry::new(dispatcher),
            plugins: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Persist and enumerate artifacts through `store` instead of the plugin directory.
    pub fn with_store(mut self, store: Arc<dyn PluginStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Entry points compiled into the host.
    pub fn with_host_scope(mut self, scope: Arc<HostScope>) -> Self {
        self.host_scope = scope;
        self
    }

    /// Services plugins reach through [`PluginContext::bean`].
    pub fn with_services(mut self, services: Arc<dyn HostServices>) -> Self {
        self.services = services;
        self
    }

    pub fn with_host_version(mut self, version: semver::Version) -> Self {
        self.host_version = version;
        self
    }

    pub fn config(&self) -> &PluginManagerConfig {
        &self.config
    }

    pub fn host_scope(&self) -> &Arc<HostScope> {
        &self.host_scope
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// Create the plugin and data directories, then auto-load if configured.
    /// Directory failures are logged, never fatal.
    pub fn initialize(&self) -> usize {
        for dir in [&self.config.plugin_directory, &self.config.data_directory] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                error!(dir = %dir.display(), error = %e, "failed to create plugin directory");
            }
        }
        if !self.config.auto_load {
            info!("plugin auto-load disabled");
            return 0;
        }
        self.load_all_plugins()
    }

    /// Load every artifact known to the store or found in the plugin
    /// directory. Returns how many loaded.
    pub fn load_all_plugins(&self) -> usize {
        let paths = match self.discover_artifacts() {
            Ok(paths) => paths,
            Err(e) => {
                error!(error = %e, "failed to enumerate plugin artifacts");
                return 0;
            }
        };

        let total = paths.len();
        let loaded = paths.iter().filter(|path| self.load_plugin(path)).count();
        info!(loaded, total, "plugin scan complete");
        loaded
    }

    fn discover_artifacts(&self) -> Result<Vec<PathBuf>, WardenError> {
        if let Some(store) = &self.store {
            let ids = store.list_plugin_ids()?;
            return Ok(ids
                .iter()
                .filter_map(|id| {
                    let path = store.plugin_path(id);
                    if path.is_none() {
                        warn!(plugin_id = %id, "store lists plugin without an artifact");
                    }
                    path
                })
                .collect());
        }

        scan_artifacts(&self.config.plugin_directory, &self.config.artifact_extension)
    }

    /// Load the artifact at `path`. Failures are logged and leave no trace.
    pub fn load_plugin(&self, path: &Path) -> bool {
        report_load(path, self.try_load_plugin(path))
    }

    /// [`load_plugin`](Self::load_plugin) with the failure cause.
    pub fn try_load_plugin(&self, path: &Path) -> Result<String, WardenError> {
        let prepared = self.prepare(path)?;
        let id = prepared.descriptor.id.clone();
        self.with_id_lock(&id, || self.activate(prepared))?;
        Ok(id)
    }

    /// Load `path`, which must declare `id`. The caller holds the id's lock.
    fn load_locked(&self, id: &str, path: &Path) -> Result<String, WardenError> {
        let prepared = self.prepare(path)?;
        if prepared.descriptor.id != id {
            return Err(WardenError::Descriptor(format!(
                "artifact {} declares id `{}` instead of `{id}`",
                path.display(),
                prepared.descriptor.id
            )));
        }
        self.activate(prepared)?;
        Ok(id.to_string())
    }

    /// Parse, validate, scope, and instantiate an artifact. Nothing is registered.
    pub fn prepare(&self, path: &Path) -> Result<PreparedPlugin, WardenError> {
        self.prepare_inner(path, None)
    }

    fn prepare_inner(
        &self,
        path: &Path,
        replacing: Option<&str>,
    ) -> Result<PreparedPlugin, WardenError> {
        let descriptor = read_descriptor(path)?;
        descriptor.validate(&self.host_version)?;

        match replacing {
            Some(id) if descriptor.id != id => {
                return Err(WardenError::Descriptor(format!(
                    "artifact {} now declares id `{}` instead of `{id}`",
                    path.display(),
                    descriptor.id
                )));
            }
            Some(_) => {}
            None if self.plugins.contains_key(&descriptor.id) => {
                return Err(WardenError::DuplicatePlugin(descriptor.id));
            }
            None => {}
        }

        let artifact_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let libraries = descriptor.library_paths(artifact_dir)?;
        let scope = ModuleScope::open(&descriptor.id, path, &libraries, self.host_scope.clone())?;

        let factory = scope
            .resolve(&descriptor.entry_point)?
            .into_plugin_factory()
            .ok_or_else(|| WardenError::NotAPlugin(descriptor.entry_point.clone()))?;
        let instance = guard(&descriptor.id, "instantiate", || Ok(factory()))?;
        drop(factory);

        debug!(plugin_id = %descriptor.id, entry_point = %descriptor.entry_point, "plugin prepared");
        Ok(PreparedPlugin {
            instance,
            descriptor,
            artifact_path: path.to_path_buf(),
            scope,
        })
    }

    /// Register a prepared plugin: insert its record, initialize it, map its routes.
    /// The caller holds the id's lock.
    fn activate(&self, prepared: PreparedPlugin) -> Result<(), WardenError> {
        let PreparedPlugin {
            instance,
            descriptor,
            artifact_path,
            scope,
        } = prepared;
        let id = descriptor.id.clone();
        let instance: Arc<dyn Plugin> = Arc::from(instance);

        let defaults = match guard(&id, "default_configuration", || {
            Ok(instance.default_configuration())
        }) {
            Ok(defaults) => defaults,
            Err(e) => {
                drop(instance);
                scope.close();
                return Err(e);
            }
        };
        let context = Arc::new(build_context(
            &descriptor,
            defaults,
            self.config.overrides.get(&id),
            &self.config.data_directory,
            self.services.clone(),
        ));

        let code = scope.lease();
        let record = PluginRecord {
            instance: instance.clone(),
            context: context.clone(),
            descriptor,
            artifact_path,
            state: PluginState::Initialized,
            loaded_at: Utc::now(),
            started_at: None,
            scope,
        };
        match self.plugins.entry(id.clone()) {
            Entry::Occupied(_) => {
                drop(instance);
                drop(context);
                record.release();
                return Err(WardenError::DuplicatePlugin(id));
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        if let Err(e) = guard(&id, "initialize", || instance.initialize(context.clone())) {
            drop(instance);
            drop(context);
            self.discard(&id);
            return Err(e);
        }
        if let Some(mut record) = self.plugins.get_mut(&id) {
            record.started_at = Some(Utc::now());
        }

        let routes_ok = match instance.as_route_contributor() {
            Some(contributor) => {
                self.endpoints
                    .register_plugin_with_lease(&id, contributor, &context, &code)
            }
            None => true,
        };
        if !routes_ok {
            if self.config.strict_routes {
                drop(instance);
                drop(context);
                self.teardown(&id);
                return Err(WardenError::Route(format!(
                    "route registration failed for plugin {id}"
                )));
            }
            warn!(plugin_id = %id, "plugin loaded without its routes");
        }

        info!(
            plugin_id = %id,
            endpoints = self.endpoints.endpoint_count(&id),
            "plugin loaded"
        );
        Ok(())
    }

    /// Remove a record without running shutdown hooks.
    fn discard(&self, id: &str) {
        if let Some((_, record)) = self.plugins.remove(id) {
            record.release();
        }
    }

    /// Unload `id`. Returns false if it is not loaded.
    pub fn unload_plugin(&self, id: &str) -> bool {
        if !self.plugins.contains_key(id) {
            return false;
        }
        self.with_id_lock(id, || self.teardown(id))
    }

    /// The unload sequence. Every step runs even if an earlier one fails.
    fn teardown(&self, id: &str) -> bool {
        let instance = match self.plugins.get_mut(id) {
            Some(mut record) => {
                record.state = PluginState::Unloading;
                record.instance.clone()
            }
            None => return false,
        };
        info!(plugin_id = %id, "unloading plugin");

        if let Err(e) = guard(id, "stop", || instance.stop()) {
            warn!(plugin_id = %id, error = %e, "plugin stop failed");
        }
        if let Err(e) = guard(id, "destroy", || instance.destroy()) {
            warn!(plugin_id = %id, error = %e, "plugin destroy failed");
        }
        self.endpoints.unregister_plugin(id);
        drop(instance);
        self.discard(id);

        info!(plugin_id = %id, "plugin unloaded");
        true
    }

    /// Replace `id` with a fresh instance from the same artifact path.
    ///
    /// The artifact is prepared first; if that fails the running instance is
    /// kept. If the new instance then fails to initialize, the id ends up
    /// unloaded.
    pub fn reload_plugin(&self, id: &str) -> bool {
        let Some(path) = self.plugins.get(id).map(|r| r.artifact_path.clone()) else {
            warn!(plugin_id = %id, "cannot reload: plugin not loaded");
            return false;
        };
        if !path.is_file() {
            warn!(plugin_id = %id, path = %path.display(), "cannot reload: artifact missing");
            return false;
        }

        let prepared = match self.prepare_inner(&path, Some(id)) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(plugin_id = %id, error = %e, "reload aborted, keeping running instance");
                return false;
            }
        };

        self.with_id_lock(id, || {
            if !self.teardown(id) {
                warn!(plugin_id = %id, "plugin was unloaded during reload, not restarting it");
                return false;
            }
            match self.activate(prepared) {
                Ok(()) => {
                    info!(plugin_id = %id, "plugin reloaded");
                    true
                }
                Err(e) => {
                    error!(plugin_id = %id, error = %e, "reload failed, plugin is now unloaded");
                    false
                }
            }
        })
    }

    /// Persist `bytes` as the artifact of `id` and load it.
    ///
    /// The artifact must declare `id` and pass validation before anything is
    /// written. An id that is already loaded is refused, as is a target path
    /// another loaded plugin was loaded from. The id's lock is held from the
    /// check through the load. Storage failures are returned as
    /// [`WardenError::Store`].
    pub fn install_plugin(&self, id: &str, bytes: &[u8]) -> Result<bool, WardenError> {
        if !is_valid_plugin_id(id) {
            return Err(WardenError::Descriptor(format!("invalid plugin id `{id}`")));
        }
        let descriptor = read_descriptor_bytes(bytes)?;
        if descriptor.id != id {
            return Err(WardenError::Descriptor(format!(
                "artifact declares id `{}`, not `{id}`",
                descriptor.id
            )));
        }
        descriptor.validate(&self.host_version)?;

        self.with_id_lock(id, || {
            if self.has_plugin(id) {
                warn!(plugin_id = %id, "install refused: plugin already loaded");
                return Ok(false);
            }
            if let Some(owner) = self.artifact_target(id).and_then(|p| self.loaded_from(&p)) {
                warn!(plugin_id = %id, owner = %owner, "install refused: artifact path belongs to a loaded plugin");
                return Err(WardenError::DuplicatePlugin(owner));
            }

            let path = self.write_artifact(id, bytes)?;
            info!(plugin_id = %id, path = %path.display(), bytes = bytes.len(), "plugin artifact stored");
            Ok(report_load(&path, self.load_locked(id, &path)))
        })
    }

    /// Where an install of `id` will put its artifact, if known up front.
    fn artifact_target(&self, id: &str) -> Option<PathBuf> {
        match &self.store {
            Some(store) => store.plugin_path(id),
            None => Some(
                self.config
                    .plugin_directory
                    .join(format!("{id}.{}", self.config.artifact_extension)),
            ),
        }
    }

    /// Id of the loaded plugin whose artifact is `path`.
    fn loaded_from(&self, path: &Path) -> Option<String> {
        self.plugins
            .iter()
            .find(|r| r.artifact_path == path)
            .map(|r| r.key().clone())
    }

    fn write_artifact(&self, id: &str, bytes: &[u8]) -> Result<PathBuf, WardenError> {
        if let Some(store) = &self.store {
            return store.store_plugin(id, bytes);
        }
        let dir = &self.config.plugin_directory;
        std::fs::create_dir_all(dir)
            .map_err(|e| WardenError::store(format!("cannot create {}", dir.display()), e))?;
        let path = dir.join(format!("{id}.{}", self.config.artifact_extension));
        std::fs::write(&path, bytes)
            .map_err(|e| WardenError::store(format!("cannot write {}", path.display()), e))?;
        Ok(path)
    }

    /// Unload `id` and optionally delete its artifact.
    pub fn remove_plugin(&self, id: &str, remove_from_store: bool) -> Result<bool, WardenError> {
        let artifact = self.plugins.get(id).map(|r| r.artifact_path.clone());
        if !self.unload_plugin(id) {
            return Ok(false);
        }
        if !remove_from_store {
            return Ok(true);
        }

        match &self.store {
            Some(store) => {
                store.delete_plugin(id)?;
            }
            None => {
                if let Some(path) = artifact.filter(|p| p.exists()) {
                    std::fs::remove_file(&path).map_err(|e| {
                        WardenError::store(format!("cannot delete {}", path.display()), e)
                    })?;
                }
            }
        }
        info!(plugin_id = %id, "plugin artifact removed");
        Ok(true)
    }

    /// Unload every plugin. Returns how many were unloaded.
    pub fn unload_all(&self) -> usize {
        let mut ids: Vec<String> = self.plugins.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids.iter().filter(|id| self.unload_plugin(id)).count()
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn get_plugin_info(&self, id: &str) -> Option<PluginInfo> {
        let record = self.plugins.get(id)?;
        Some(self.info_of(id, &record))
    }

    /// Every loaded plugin, sorted by id.
    pub fn get_all_plugins(&self) -> Vec<PluginInfo> {
        let mut all: Vec<PluginInfo> = self
            .plugins
            .iter()
            .map(|r| self.info_of(r.key(), r.value()))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// The context of a loaded plugin, for querying services it registered.
    pub fn plugin_context(&self, id: &str) -> Option<Arc<PluginContext>> {
        self.plugins.get(id).map(|r| r.context.clone())
    }

    pub fn get_plugin_endpoints(&self, id: &str) -> Vec<EndpointInfo> {
        self.endpoints.get_plugin_endpoints(id)
    }

    pub fn get_all_plugin_endpoints(&self) -> std::collections::BTreeMap<String, Vec<EndpointInfo>> {
        self.endpoints.get_all_plugin_endpoints()
    }

    fn info_of(&self, id: &str, record: &PluginRecord) -> PluginInfo {
        PluginInfo {
            id: id.to_string(),
            version: record.descriptor.version.clone(),
            description: record.descriptor.description.clone(),
            entry_point: record.descriptor.entry_point.clone(),
            state: record.state,
            artifact_path: record.artifact_path.clone(),
            data_directory: record.context.data_directory().to_path_buf(),
            loaded_at: record.loaded_at,
            started_at: record.started_at,
            endpoint_count: self.endpoints.endpoint_count(id),
        }
    }

    /// Run `f` holding the lock of `id`. The lock entry is dropped afterwards
    /// unless another caller still holds or waits on it.
    fn with_id_lock<T>(&self, id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.locks.entry(id.to_string()).or_default().clone();
        let result = {
            let _held = lock.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };
        drop(lock);
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        let unloaded = self.unload_all();
        if unloaded > 0 {
            debug!(unloaded, "plugins unloaded on manager drop");
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("config", &self.config)
            .field("host_version", &self.host_version)
            .field("plugins", &self.plugins.len())
            .field("store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use warden_test_utils::{ArtifactBuilder, PluginFixture, RecordingDispatcher};

    fn manager_in(dir: &Path) -> PluginManager {
        PluginManager::new(
            PluginManagerConfig {
                plugin_directory: dir.join("plugins"),
                data_directory: dir.join("data"),
                ..PluginManagerConfig::default()
            },
            Arc::new(RecordingDispatcher::new()),
        )
    }

    #[test]
    #[traced_test]
    fn duplicate_load_is_logged_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager
            .host_scope()
            .register_plugin("dup.Plugin", PluginFixture::new().factory());
        let path = ArtifactBuilder::new("dup", "dup.Plugin").write_to(&dir.path().join("plugins"));

        assert!(manager.load_plugin(&path));
        assert!(!manager.load_plugin(&path));
        assert!(logs_contain("plugin already loaded"));
    }

    #[test]
    fn prepared_plugin_is_not_registered() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager
            .host_scope()
            .register_plugin("p.Plugin", PluginFixture::new().factory());
        let path = ArtifactBuilder::new("p", "p.Plugin").write_to(&dir.path().join("plugins"));

        let prepared = manager.prepare(&path).unwrap();
        assert_eq!(prepared.descriptor().id, "p");
        assert_eq!(prepared.artifact_path(), path.as_path());
        assert!(!manager.has_plugin("p"));
        drop(prepared);
        assert!(manager.load_plugin(&path));
    }

    #[test]
    fn host_version_is_the_crate_version() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        assert_eq!(manager.host_version.to_string(), HOST_VERSION);
    }

    #[test]
    fn unloading_unknown_ids_leaves_no_lock_entries() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        for i in 0..10_000 {
            assert!(!manager.unload_plugin(&format!("ghost-{i}")));
        }
        assert!(!manager.reload_plugin("ghost"));
        assert!(manager.locks.is_empty());
    }

    #[test]
    fn lock_entries_are_dropped_after_each_operation() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager
            .host_scope()
            .register_plugin("p.Plugin", PluginFixture::new().factory());
        let path = ArtifactBuilder::new("p", "p.Plugin").write_to(&dir.path().join("plugins"));

        assert!(manager.load_plugin(&path));
        assert!(manager.locks.is_empty());
        assert!(manager.reload_plugin("p"));
        assert!(manager.unload_plugin("p"));
        assert!(manager.install_plugin("q", b"not an archive").is_err());
        assert!(manager.locks.is_empty());
    }

    #[test]
    fn lock_entry_survives_while_another_caller_holds_it() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let outer = manager.with_id_lock("p", || {
            let waiting = manager.locks.get("p").map(|l| l.clone());
            assert!(waiting.is_some());
            waiting
        });
        assert!(manager.locks.contains_key("p"));
        drop(outer);
        manager.with_id_lock("p", || ());
        assert!(manager.locks.is_empty());
    }
}
