// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the plugin contract, the runtime, and the gateway.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::routing::path_shape;

/// HTTP methods a plugin route can be mapped to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

/// Lifecycle state of a loaded plugin.
///
/// A plugin only exists in the registry between a successful load and the end
/// of its unload, so there is no "absent" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
    /// Loaded and initialized; routes (if any) are live.
    Initialized,
    /// Teardown in progress.
    Unloading,
}

/// A single mapping in the host dispatcher: one normalized path and one method.
///
/// `method: None` maps every method on the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub path: String,
    pub method: Option<HttpMethod>,
}

impl RouteKey {
    pub fn new(path: impl Into<String>, method: Option<HttpMethod>) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }

    /// Two keys overlap when their paths have the same shape (parameter names
    /// ignored) and either side matches any method or both name the same one.
    pub fn overlaps(&self, other: &RouteKey) -> bool {
        if path_shape(&self.path) != path_shape(&other.path) {
            return false;
        }
        match (self.method, other.method) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        }
    }

    /// Method label used in logs and errors.
    pub fn method_label(&self) -> String {
        self.method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "ANY".to_string())
    }
}

/// One route-producing controller method as registered for a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Owning plugin id.
    pub plugin_id: String,
    /// Controller that declared the route.
    pub controller: String,
    /// Name of the handler method within the controller.
    pub handler: String,
    /// Full paths, prefix and class-level paths included.
    pub paths: Vec<String>,
    /// HTTP methods; empty means every method.
    pub methods: Vec<HttpMethod>,
}

impl EndpointInfo {
    /// Every dispatcher key this endpoint occupies.
    pub fn route_keys(&self) -> Vec<RouteKey> {
        let mut keys = Vec::new();
        for path in &self.paths {
            if self.methods.is_empty() {
                keys.push(RouteKey::new(path.clone(), None));
            } else {
                for method in &self.methods {
                    keys.push(RouteKey::new(path.clone(), Some(*method)));
                }
            }
        }
        keys
    }
}

/// An HTTP request handed to a plugin route handler.
#[derive(Debug, Clone)]
pub struct PluginRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Values captured by `{name}` segments of the matched route.
    pub path_params: HashMap<String, String>,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PluginRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: HashMap::new(),
            query: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

/// The response a plugin route handler produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PluginResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: body.into().into_bytes(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn http_method_parses_case_insensitively() {
        assert_eq!(HttpMethod::from_str("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::from_str("DELETE").unwrap(), HttpMethod::Delete);
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert!(HttpMethod::from_str("TRACE").is_err());
    }

    #[test]
    fn plugin_state_display() {
        assert_eq!(PluginState::Initialized.to_string(), "INITIALIZED");
        assert_eq!(PluginState::Unloading.to_string(), "UNLOADING");
        let json = serde_json::to_string(&PluginState::Unloading).unwrap();
        assert_eq!(json, "\"UNLOADING\"");
    }

    #[test]
    fn route_keys_overlap_on_same_shape_and_method() {
        let a = RouteKey::new("/api/users/{id}", Some(HttpMethod::Get));
        let b = RouteKey::new("/api/users/{user}", Some(HttpMethod::Get));
        let c = RouteKey::new("/api/users/{id}", Some(HttpMethod::Post));
        let any = RouteKey::new("/api/users/{id}", None);
        let other = RouteKey::new("/api/users/me", Some(HttpMethod::Get));

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(any.overlaps(&c));
        assert!(!a.overlaps(&other));
    }

    #[test]
    fn endpoint_route_keys_expand_paths_and_methods() {
        let info = EndpointInfo {
            plugin_id: "billing".into(),
            controller: "invoices".into(),
            handler: "list".into(),
            paths: vec!["/a".into(), "/b".into()],
            methods: vec![HttpMethod::Get, HttpMethod::Head],
        };
        assert_eq!(info.route_keys().len(), 4);

        let any = EndpointInfo {
            methods: vec![],
            ..info
        };
        let keys = any.route_keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.method.is_none()));
        assert_eq!(keys[0].method_label(), "ANY");
    }

    #[test]
    fn request_header_lookup_ignores_case() {
        let mut req = PluginRequest::new(HttpMethod::Get, "/x");
        req.headers.push(("X-Tenant".into(), "acme".into()));
        assert_eq!(req.header("x-tenant"), Some("acme"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn json_response_sets_content_type() {
        let resp = PluginResponse::json(200, &serde_json::json!({"ok": true}));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.headers[0].1, "application/json");
        assert_eq!(resp.body, br#"{"ok":true}"#.to_vec());
    }
}
