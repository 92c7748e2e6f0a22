// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the gateway app: admin API, auth, and live plugin routes.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use warden_core::{ControllerRoutes, RouteDispatcher};
use warden_gateway::{AuthConfig, GatewayState, LiveRouter, build_app};
use warden_plugin::{HostScope, PluginManager, PluginManagerConfig};
use warden_test_utils::{ArtifactBuilder, LifecycleCounters, PluginFixture, controller, text_handler};

struct TestApp {
    app: Router,
    router: Arc<LiveRouter>,
    manager: Arc<PluginManager>,
    counters: Arc<LifecycleCounters>,
    dir: TempDir,
}

impl TestApp {
    fn new(token: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(HostScope::new());

        let fixture = PluginFixture::new().with_prefix("/api/plugins/billing");
        let counters = fixture.counters();
        let fixture = fixture.with_controller(controller(
            "InvoiceController",
            counters.clone(),
            ControllerRoutes::new().get("list", "/invoices", text_handler("[]")),
        ));
        host.register_plugin("BillingPlugin", fixture.factory());

        let router = Arc::new(LiveRouter::new());
        let config = PluginManagerConfig {
            plugin_directory: dir.path().join("plugins"),
            data_directory: dir.path().join("data"),
            ..PluginManagerConfig::default()
        };
        let manager = Arc::new(PluginManager::new(config, router.clone()).with_host_scope(host));
        let state = GatewayState::new(
            manager.clone(),
            router.clone(),
            AuthConfig::new(token.map(str::to_string)),
        );

        Self {
            dir,
            router,
            manager,
            counters,
            app: build_app(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn install(&self, id: &str, bytes: Vec<u8>) -> Response {
        self.send(
            Request::put(format!("/admin/plugins/{id}"))
                .body(Body::from(bytes))
                .unwrap(),
        )
        .await
    }

    async fn install_billing(&self) -> Response {
        self.install("billing", ArtifactBuilder::new("billing", "BillingPlugin").to_bytes())
            .await
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new(Some("s3cret"));
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["plugins"], 0);
}

#[tokio::test]
async fn admin_requires_token_when_configured() {
    let app = TestApp::new(Some("s3cret"));

    let response = app.get("/admin/plugins").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(
            Request::get("/admin/plugins")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(
            Request::get("/admin/plugins")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn admin_is_open_without_token() {
    let app = TestApp::new(None);
    assert_eq!(app.get("/admin/plugins").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn install_makes_plugin_routes_live() {
    let app = TestApp::new(None);

    let response = app.install_billing().await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let info = body_json(response).await;
    assert_eq!(info["id"], "billing");
    assert_eq!(info["state"], "INITIALIZED");
    assert_eq!(info["endpoint_count"], 1);
    assert!(app.dir.path().join("plugins/billing.zip").is_file());

    let response = app.get("/api/plugins/billing/invoices").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"[]");

    let listed = body_json(app.get("/admin/plugins").await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let endpoints = body_json(app.get("/admin/plugins/billing/endpoints").await).await;
    assert_eq!(endpoints[0]["paths"][0], "/api/plugins/billing/invoices");
    assert_eq!(endpoints[0]["methods"][0], "GET");

    let all = body_json(app.get("/admin/plugins/endpoints").await).await;
    assert_eq!(all["billing"].as_array().unwrap().len(), 1);

    let health = body_json(app.get("/health").await).await;
    assert_eq!(health["plugins"], 1);
}

#[tokio::test]
async fn install_of_loaded_id_conflicts() {
    let app = TestApp::new(None);
    assert_eq!(app.install_billing().await.status(), StatusCode::CREATED);

    let response = app.install_billing().await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("already loaded"));
    assert_eq!(app.counters.instances(), 1);
}

#[tokio::test]
async fn install_rejects_bad_requests() {
    let app = TestApp::new(None);

    let response = app.install("billing", Vec::new()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .install("bad%20id", ArtifactBuilder::new("bad id", "BillingPlugin").to_bytes())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.manager.get_all_plugins().is_empty());
}

#[tokio::test]
async fn install_under_a_foreign_id_is_rejected() {
    let app = TestApp::new(None);
    assert_eq!(app.install_billing().await.status(), StatusCode::CREATED);

    let bytes = ArtifactBuilder::new("billing", "BillingPlugin")
        .version("6.6.6")
        .to_bytes();
    let response = app.install("shadow", bytes).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("declares id `billing`"));

    assert!(!app.manager.has_plugin("shadow"));
    assert_eq!(app.counters.instances(), 1);
}

#[tokio::test]
async fn install_of_unloadable_artifact_is_unprocessable() {
    let app = TestApp::new(None);
    let bytes = ArtifactBuilder::new("ledger", "missing.EntryPoint").to_bytes();

    let response = app.install("ledger", bytes).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!app.manager.has_plugin("ledger"));
}

#[tokio::test]
async fn unknown_plugin_is_not_found() {
    let app = TestApp::new(None);
    assert_eq!(app.get("/admin/plugins/ghost").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        app.get("/admin/plugins/ghost/endpoints").await.status(),
        StatusCode::NOT_FOUND
    );

    let reload = Request::post("/admin/plugins/ghost/reload")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(reload).await.status(), StatusCode::NOT_FOUND);

    let delete = Request::delete("/admin/plugins/ghost")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(delete).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_swaps_in_a_fresh_instance() {
    let app = TestApp::new(None);
    assert_eq!(app.install_billing().await.status(), StatusCode::CREATED);

    let request = Request::post("/admin/plugins/billing/reload")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.counters.instances(), 2);
    assert_eq!(app.counters.destroyed(), 1);
    let response = app.get("/api/plugins/billing/invoices").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_with_purge_retracts_routes_and_artifact() {
    let app = TestApp::new(None);
    assert_eq!(app.install_billing().await.status(), StatusCode::CREATED);
    let artifact = app.dir.path().join("plugins/billing.zip");
    assert!(artifact.is_file());

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/admin/plugins/billing?purge=true")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::NO_CONTENT);

    assert!(!artifact.exists());
    assert!(app.router.is_empty());
    assert_eq!(
        app.get("/api/plugins/billing/invoices").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn delete_without_purge_keeps_artifact() {
    let app = TestApp::new(None);
    assert_eq!(app.install_billing().await.status(), StatusCode::CREATED);

    let request = Request::delete("/admin/plugins/billing")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::NO_CONTENT);

    assert!(app.dir.path().join("plugins/billing.zip").is_file());
    assert!(!app.manager.has_plugin("billing"));
}
