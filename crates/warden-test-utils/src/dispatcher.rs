// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`RouteDispatcher`] that records every mapping.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use warden_core::routing::match_template;
use warden_core::{
    HttpMethod, PluginRequest, PluginResponse, RouteDispatcher, RouteHandler, RouteKey,
    WardenError,
};

/// Route table behind a mutex, with overlap detection and injectable failures.
#[derive(Default)]
pub struct RecordingDispatcher {
    routes: Mutex<BTreeMap<RouteKey, Arc<dyn RouteHandler>>>,
    failing_paths: Mutex<HashSet<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every registration on `path` fail.
    pub fn fail_on(&self, path: &str) {
        self.failing_paths
            .lock()
            .expect("lock")
            .insert(path.to_string());
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<RouteKey> {
        self.routes.lock().expect("lock").keys().cloned().collect()
    }

    /// Registered paths, sorted and deduplicated.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.keys().into_iter().map(|k| k.path).collect();
        paths.dedup();
        paths
    }

    /// Find the handler for a request: exact method first, then any-method.
    ///
    /// The returned handler is a snapshot, like the one an in-flight request holds.
    pub fn resolve(
        &self,
        method: HttpMethod,
        path: &str,
    ) -> Option<(Arc<dyn RouteHandler>, HashMap<String, String>)> {
        let routes = self.routes.lock().expect("lock");
        [Some(method), None].into_iter().find_map(|want| {
            routes.iter().find_map(|(key, handler)| {
                if key.method != want {
                    return None;
                }
                match_template(&key.path, path).map(|params| (handler.clone(), params))
            })
        })
    }

    /// Route a request the way the live host would.
    pub async fn dispatch(&self, method: HttpMethod, path: &str) -> Option<PluginResponse> {
        let (handler, params) = self.resolve(method, path)?;
        let mut request = PluginRequest::new(method, path);
        request.path_params = params;
        Some(handler.handle(request).await)
    }
}

impl RouteDispatcher for RecordingDispatcher {
    fn register(&self, key: RouteKey, handler: Arc<dyn RouteHandler>) -> Result<(), WardenError> {
        if self.failing_paths.lock().expect("lock").contains(&key.path) {
            return Err(WardenError::Route(format!(
                "dispatcher refused {} {}",
                key.method_label(),
                key.path
            )));
        }
        let mut routes = self.routes.lock().expect("lock");
        if routes.keys().any(|existing| existing.overlaps(&key)) {
            return Err(WardenError::RouteConflict {
                method: key.method_label(),
                path: key.path,
            });
        }
        routes.insert(key, handler);
        Ok(())
    }

    fn unregister(&self, key: &RouteKey) -> bool {
        self.routes.lock().expect("lock").remove(key).is_some()
    }

    fn contains(&self, key: &RouteKey) -> bool {
        self.routes.lock().expect("lock").contains_key(key)
    }

    fn len(&self) -> usize {
        self.routes.lock().expect("lock").len()
    }
}
