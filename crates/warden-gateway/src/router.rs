// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live plugin route dispatcher.
//!
//! [`LiveRouter`] keeps the authoritative route table behind a mutex and
//! publishes a freshly built axum [`Router`] through `arc-swap` after every
//! change. Request handling never takes the mutex: it loads the current
//! snapshot and forwards to it.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use warden_core::routing::match_template;
use warden_core::{
    HttpMethod, PluginRequest, PluginResponse, RouteDispatcher, RouteHandler, RouteKey,
    WardenError,
};
use warden_plugin::guard::panic_message;

/// Upper bound on a request body forwarded to a plugin handler.
pub const MAX_PLUGIN_BODY_BYTES: usize = 16 * 1024 * 1024;

type RouteTable = BTreeMap<RouteKey, Arc<dyn RouteHandler>>;

/// Route dispatcher backing plugin endpoints in the running server.
pub struct LiveRouter {
    routes: Mutex<RouteTable>,
    current: ArcSwap<Router>,
}

impl LiveRouter {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(BTreeMap::new()),
            current: ArcSwap::from_pointee(build_router(&BTreeMap::new())),
        }
    }

    /// The most recently published router snapshot.
    pub fn current(&self) -> Arc<Router> {
        self.current.load_full()
    }

    /// Forward a request to the current snapshot.
    pub async fn dispatch(&self, request: Request) -> Response {
        let router = Router::clone(&self.current());
        match router.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<RouteKey> {
        self.table().keys().cloned().collect()
    }

    fn table(&self) -> MutexGuard<'_, RouteTable> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, routes: &RouteTable) -> Result<(), String> {
        let router = catch_unwind(AssertUnwindSafe(|| build_router(routes)))
            .map_err(|payload| panic_message(payload.as_ref()))?;
        self.current.store(Arc::new(router));
        Ok(())
    }
}

impl Default for LiveRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LiveRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveRouter")
            .field("routes", &self.keys())
            .finish()
    }
}

impl RouteDispatcher for LiveRouter {
    fn register(&self, key: RouteKey, handler: Arc<dyn RouteHandler>) -> Result<(), WardenError> {
        let mut routes = self.table();
        if routes.keys().any(|existing| existing.overlaps(&key)) {
            return Err(WardenError::RouteConflict {
                method: key.method_label(),
                path: key.path,
            });
        }

        routes.insert(key.clone(), handler);
        if let Err(message) = self.publish(&routes) {
            routes.remove(&key);
            tracing::warn!(
                path = %key.path,
                method = %key.method_label(),
                error = %message,
                "router rejected route"
            );
            return Err(WardenError::Route(format!(
                "{} {} rejected by router: {message}",
                key.method_label(),
                key.path
            )));
        }

        tracing::debug!(path = %key.path, method = %key.method_label(), "route mapped");
        Ok(())
    }

    fn unregister(&self, key: &RouteKey) -> bool {
        let mut routes = self.table();
        if routes.remove(key).is_none() {
            return false;
        }
        if let Err(message) = self.publish(&routes) {
            tracing::error!(path = %key.path, error = %message, "router rebuild failed after unmapping");
        }
        tracing::debug!(path = %key.path, method = %key.method_label(), "route unmapped");
        true
    }

    fn contains(&self, key: &RouteKey) -> bool {
        self.table().contains_key(key)
    }

    fn len(&self) -> usize {
        self.table().len()
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Head => MethodFilter::HEAD,
        HttpMethod::Options => MethodFilter::OPTIONS,
    }
}

/// Build an axum router for the table. Panics when axum rejects a path.
fn build_router(routes: &RouteTable) -> Router {
    let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();
    for (key, handler) in routes {
        let endpoint = {
            let handler = Arc::clone(handler);
            let template = key.path.clone();
            move |request: Request| {
                let handler = Arc::clone(&handler);
                let template = template.clone();
                async move { call_plugin(&template, handler, request).await }
            }
        };
        let method_router = by_path
            .remove(key.path.as_str())
            .unwrap_or_else(MethodRouter::new);
        let method_router = match key.method {
            Some(method) => method_router.on(method_filter(method), endpoint),
            None => method_router.fallback(endpoint),
        };
        by_path.insert(key.path.as_str(), method_router);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(path, method_router)
        })
        .layer(CatchPanicLayer::new())
}

async fn call_plugin(template: &str, handler: Arc<dyn RouteHandler>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(method) = HttpMethod::from_str(parts.method.as_str()) else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };
    let body = match axum::body::to_bytes(body, MAX_PLUGIN_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "failed to read plugin request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let path = parts.uri.path();
    let mut plugin_request = PluginRequest::new(method, path);
    plugin_request.path_params = match_template(template, path).unwrap_or_default();
    plugin_request.query = parts.uri.query().map(str::to_string);
    plugin_request.headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    plugin_request.body = body.to_vec();

    into_http_response(handler.handle(plugin_request).await)
}

fn into_http_response(response: PluginResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        tracing::warn!(status = response.status, "plugin returned an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = status;
    for (name, value) in response.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                http.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid plugin response header"),
        }
    }
    http
}
