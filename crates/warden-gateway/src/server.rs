// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up the admin routes, the health check, and the fallback into the
//! live plugin router.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use warden_core::WardenError;
use warden_plugin::PluginManager;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::router::LiveRouter;

/// Largest artifact accepted by PUT /admin/plugins/{id}.
pub const MAX_ARTIFACT_BYTES: usize = 64 * 1024 * 1024;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<PluginManager>,
    /// Must be the dispatcher the manager registers routes with.
    pub router: Arc<LiveRouter>,
    pub auth: AuthConfig,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(manager: Arc<PluginManager>, router: Arc<LiveRouter>, auth: AuthConfig) -> Self {
        Self {
            manager,
            router,
            auth,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Gateway server configuration (mirrors `[server]` from warden-config).
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for the admin API (None = open).
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Assemble the application router.
///
/// - GET /health (public)
/// - /admin/plugins/... (bearer auth when a token is configured)
/// - anything else goes to the live plugin router
pub fn build_app(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/plugins", get(handlers::list_plugins))
        .route("/admin/plugins/endpoints", get(handlers::list_all_endpoints))
        .route(
            "/admin/plugins/{id}",
            get(handlers::get_plugin)
                .put(handlers::install_plugin)
                .delete(handlers::remove_plugin),
        )
        .route(
            "/admin/plugins/{id}/endpoints",
            get(handlers::get_plugin_endpoints),
        )
        .route("/admin/plugins/{id}/reload", post(handlers::reload_plugin))
        .layer(DefaultBodyLimit::max(MAX_ARTIFACT_BYTES))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let plugins = state.router.clone();
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .fallback(move |request: Request| async move { plugins.dispatch(request).await })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `host:port` and serve until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), WardenError> {
    if config.admin_token.is_none() {
        tracing::warn!("no admin token configured, admin API is unauthenticated");
    }
    let app = build_app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WardenError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| WardenError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_plugin::PluginManagerConfig;

    #[test]
    fn gateway_state_is_clone() {
        let router = Arc::new(LiveRouter::new());
        let manager = Arc::new(PluginManager::new(
            PluginManagerConfig::default(),
            router.clone(),
        ));
        let state = GatewayState::new(manager, router, AuthConfig::default());
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.router, &cloned.router));
    }

    #[test]
    fn server_config_debug_redacts_token() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8480,
            admin_token: Some("s3cret".to_string()),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("8480"));
        assert!(!debug.contains("s3cret"));
    }
}
