// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for the admin API and the public health check.
//!
//! The plugin manager is synchronous and may run plugin hooks that block, so
//! every call into it goes through `spawn_blocking`.

use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use warden_core::{EndpointInfo, WardenError};
use warden_plugin::PluginInfo;

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Number of loaded plugins.
    pub plugins: usize,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query string of DELETE /admin/plugins/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct RemoveQuery {
    /// Also delete the stored artifact.
    #[serde(default)]
    pub purge: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn plugin_not_found(id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("plugin not found: {id}"))
}

fn status_for(error: &WardenError) -> StatusCode {
    match error {
        WardenError::Descriptor(_) => StatusCode::BAD_REQUEST,
        WardenError::PluginNotFound(_) => StatusCode::NOT_FOUND,
        WardenError::DuplicatePlugin(_) | WardenError::RouteConflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run a manager call off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "admin task failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "admin task failed")
    })
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        plugins: state.manager.get_all_plugins().len(),
    })
}

/// GET /admin/plugins
pub async fn list_plugins(State(state): State<GatewayState>) -> Json<Vec<PluginInfo>> {
    Json(state.manager.get_all_plugins())
}

/// GET /admin/plugins/endpoints
pub async fn list_all_endpoints(
    State(state): State<GatewayState>,
) -> Json<BTreeMap<String, Vec<EndpointInfo>>> {
    Json(state.manager.get_all_plugin_endpoints())
}

/// GET /admin/plugins/{id}
pub async fn get_plugin(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    match state.manager.get_plugin_info(&id) {
        Some(info) => Json(info).into_response(),
        None => plugin_not_found(&id),
    }
}

/// GET /admin/plugins/{id}/endpoints
pub async fn get_plugin_endpoints(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    if !state.manager.has_plugin(&id) {
        return plugin_not_found(&id);
    }
    Json(state.manager.get_plugin_endpoints(&id)).into_response()
}

/// PUT /admin/plugins/{id}
///
/// The request body is the raw artifact. Responds 201 with the plugin info
/// once it is loaded, 400 when the artifact is invalid or declares another id,
/// 409 if the id is already loaded, and 422 when the artifact was stored but
/// could not be loaded.
pub async fn install_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty artifact body");
    }

    let manager = state.manager.clone();
    let plugin_id = id.clone();
    let outcome = match blocking(move || {
        let was_loaded = manager.has_plugin(&plugin_id);
        let result = manager.install_plugin(&plugin_id, &body);
        (was_loaded, result, manager.get_plugin_info(&plugin_id))
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match outcome {
        (_, Ok(true), Some(info)) => (StatusCode::CREATED, Json(info)).into_response(),
        (true, Ok(false), _) => error_response(
            StatusCode::CONFLICT,
            format!("plugin already loaded: {id}"),
        ),
        (_, Ok(_), _) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("artifact for {id} stored but failed to load"),
        ),
        (_, Err(e), _) => {
            tracing::warn!(plugin_id = %id, error = %e, "plugin install failed");
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// POST /admin/plugins/{id}/reload
pub async fn reload_plugin(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    if !state.manager.has_plugin(&id) {
        return plugin_not_found(&id);
    }

    let manager = state.manager.clone();
    let plugin_id = id.clone();
    let (reloaded, info) = match blocking(move || {
        let reloaded = manager.reload_plugin(&plugin_id);
        (reloaded, manager.get_plugin_info(&plugin_id))
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match (reloaded, info) {
        (true, Some(info)) => Json(info).into_response(),
        (_, Some(_)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("reload of {id} failed, previous instance kept"),
        ),
        (_, None) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("reload of {id} failed, plugin is unloaded"),
        ),
    }
}

/// DELETE /admin/plugins/{id}?purge=true
pub async fn remove_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> Response {
    let manager = state.manager.clone();
    let plugin_id = id.clone();
    let result = match blocking(move || manager.remove_plugin(&plugin_id, query.purge)).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    match result {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => plugin_not_found(&id),
        Err(e) => {
            tracing::warn!(plugin_id = %id, error = %e, "plugin removal failed");
            error_response(status_for(&e), e.to_string())
        }
    }
}
