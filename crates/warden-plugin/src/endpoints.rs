// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration of plugin routes against the host dispatcher.
//!
//! Every mapping is recorded per plugin id so it can be retracted in full.
//! A registration pass either succeeds for every controller or leaves no
//! mapping behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, error, info, warn};
use warden_core::routing::{combine_paths, validate_path};
use warden_core::{
    Controller, ControllerSpec, EndpointInfo, PluginContext, RouteContributor, RouteDispatcher,
    RouteKey, WardenError,
};

use crate::guard::guard;
use crate::scope::CodeLease;

/// Tracks the routes and controller instances of every plugin.
pub struct EndpointRegistry {
    dispatcher: Arc<dyn RouteDispatcher>,
    endpoints: DashMap<String, Vec<EndpointInfo>>,
    controllers: DashMap<String, Vec<Box<dyn Controller>>>,
}

/// Prefix used when a contributor declares none.
pub fn default_api_prefix(plugin_id: &str) -> String {
    format!("/api/plugins/{plugin_id}")
}

impl EndpointRegistry {
    pub fn new(dispatcher: Arc<dyn RouteDispatcher>) -> Self {
        Self {
            dispatcher,
            endpoints: DashMap::new(),
            controllers: DashMap::new(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<dyn RouteDispatcher> {
        &self.dispatcher
    }

    /// Instantiate the contributor's controllers and map their routes.
    ///
    /// Returns false, with nothing left mapped for `plugin_id`, if any
    /// controller fails. A plugin that already has registrations is refused
    /// without touching them.
    pub fn register_plugin(
        &self,
        plugin_id: &str,
        contributor: &dyn RouteContributor,
        context: &Arc<PluginContext>,
    ) -> bool {
        self.register_plugin_with_lease(plugin_id, contributor, context, &CodeLease::default())
    }

    /// [`register_plugin`](Self::register_plugin) for a plugin whose code
    /// lives in a native library. Every mapped handler holds `code`, so the
    /// library stays loaded while a dispatcher snapshot can still call it.
    pub fn register_plugin_with_lease(
        &self,
        plugin_id: &str,
        contributor: &dyn RouteContributor,
        context: &Arc<PluginContext>,
        code: &CodeLease,
    ) -> bool {
        match self.endpoints.entry(plugin_id.to_string()) {
            Entry::Occupied(_) => {
                warn!(plugin_id, "routes already registered for plugin");
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(Vec::new());
            }
        }

        let prefix = contributor
            .api_prefix()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| default_api_prefix(plugin_id));

        let specs = match guard(plugin_id, "controllers", || Ok(contributor.controllers())) {
            Ok(specs) => specs,
            Err(e) => {
                error!(plugin_id, error = %e, "failed to list controllers");
                self.unregister_plugin(plugin_id);
                return false;
            }
        };

        for spec in &specs {
            if let Err(e) = self.register_controller(plugin_id, &prefix, spec, context, code) {
                error!(plugin_id, controller = spec.name(), error = %e, "controller registration failed, rolling back plugin routes");
                self.unregister_plugin(plugin_id);
                return false;
            }
        }

        info!(
            plugin_id,
            prefix = %prefix,
            controllers = specs.len(),
            endpoints = self.endpoint_count(plugin_id),
            "plugin routes registered"
        );
        true
    }

    fn register_controller(
        &self,
        plugin_id: &str,
        prefix: &str,
        spec: &ControllerSpec,
        context: &Arc<PluginContext>,
        code: &CodeLease,
    ) -> Result<(), WardenError> {
        let controller = guard(plugin_id, "controller construction", || {
            spec.instantiate(context)
        })?;
        let attached = guard(plugin_id, "controller attach", || {
            controller.attach(Some(context.clone()));
            Ok(())
        });
        let routes = attached.and_then(|()| {
            guard(plugin_id, "controller routes", || Ok(controller.routes()))
        });
        // Tracked before any mapping so a rollback detaches and closes it.
        self.controllers
            .entry(plugin_id.to_string())
            .or_default()
            .push(controller);
        let routes = routes?;

        for method in &routes.methods {
            let paths = combine_paths(prefix, &routes.base_paths, &method.paths);
            for path in &paths {
                validate_path(path)?;
            }
            let info = EndpointInfo {
                plugin_id: plugin_id.to_string(),
                controller: spec.name().to_string(),
                handler: method.name.clone(),
                paths,
                methods: method.methods.clone(),
            };

            let handler = code.hold(method.handler.clone());
            let mut mapped: Vec<RouteKey> = Vec::new();
            for key in info.route_keys() {
                if let Err(e) = self.dispatcher.register(key.clone(), handler.clone()) {
                    for done in &mapped {
                        self.dispatcher.unregister(done);
                    }
                    return Err(e);
                }
                debug!(plugin_id, method = %key.method_label(), path = %key.path, "route mapped");
                mapped.push(key);
            }

            self.endpoints
                .entry(plugin_id.to_string())
                .or_default()
                .push(info);
        }
        Ok(())
    }

    /// Retract every mapping of `plugin_id`, then detach and close its
    /// controllers. Returns false if nothing was registered.
    pub fn unregister_plugin(&self, plugin_id: &str) -> bool {
        let endpoints = self.endpoints.remove(plugin_id).map(|(_, v)| v);
        let controllers = self.controllers.remove(plugin_id).map(|(_, v)| v);
        if endpoints.is_none() && controllers.is_none() {
            return false;
        }

        let mut retracted = 0usize;
        for info in endpoints.unwrap_or_default() {
            for key in info.route_keys() {
                if self.dispatcher.unregister(&key) {
                    retracted += 1;
                } else {
                    debug!(plugin_id, method = %key.method_label(), path = %key.path, "route was not mapped");
                }
            }
        }

        for controller in controllers.unwrap_or_default() {
            let detached = guard(plugin_id, "controller detach", || {
                controller.attach(None);
                Ok(())
            });
            if let Err(e) = detached {
                warn!(plugin_id, error = %e, "controller detach failed");
            }
            if let Err(e) = guard(plugin_id, "controller close", || controller.close()) {
                warn!(plugin_id, error = %e, "controller close failed");
            }
        }

        info!(plugin_id, routes = retracted, "plugin routes unregistered");
        true
    }

    /// Endpoints of one plugin; empty for an unknown id.
    pub fn get_plugin_endpoints(&self, plugin_id: &str) -> Vec<EndpointInfo> {
        self.endpoints
            .get(plugin_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Endpoints of every plugin, keyed by plugin id.
    pub fn get_all_plugin_endpoints(&self) -> BTreeMap<String, Vec<EndpointInfo>> {
        self.endpoints
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Number of route-producing controller methods registered for `plugin_id`.
    pub fn endpoint_count(&self, plugin_id: &str) -> usize {
        self.endpoints.get(plugin_id).map_or(0, |e| e.len())
    }

    pub fn has_plugin(&self, plugin_id: &str) -> bool {
        self.endpoints.contains_key(plugin_id)
    }
}

impl std::fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("plugins", &self.endpoints.len())
            .field("routes", &self.dispatcher.len())
            .finish()
    }
}
