// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Controllers and their declared route metadata.
//!
//! A controller states its routes once, as data: class-level base paths plus
//! a list of route methods (paths, HTTP methods, handler). The endpoint
//! registry combines these with the plugin's API prefix at registration time.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::PluginContext;
use crate::error::WardenError;
use crate::types::{HttpMethod, PluginRequest, PluginResponse};

/// Serves requests for one route method.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, request: PluginRequest) -> PluginResponse;
}

#[async_trait]
impl<F> RouteHandler for F
where
    F: Fn(PluginRequest) -> PluginResponse + Send + Sync,
{
    async fn handle(&self, request: PluginRequest) -> PluginResponse {
        self(request)
    }
}

/// A controller instance created for one plugin registration.
pub trait Controller: Send + Sync {
    /// The routes this controller serves.
    fn routes(&self) -> ControllerRoutes;

    /// Context hook: `Some` on registration, `None` on retraction.
    fn attach(&self, _context: Option<Arc<PluginContext>>) {}

    /// Release controller-held resources on retraction.
    fn close(&self) -> Result<(), WardenError> {
        Ok(())
    }
}

type ControllerFactory =
    dyn Fn(&Arc<PluginContext>) -> Result<Box<dyn Controller>, WardenError> + Send + Sync;

/// A named controller factory declared by a route contributor.
///
/// The factory receives the plugin context, through which it can also reach
/// host services.
#[derive(Clone)]
pub struct ControllerSpec {
    name: String,
    factory: Arc<ControllerFactory>,
}

impl ControllerSpec {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Arc<PluginContext>) -> Result<Box<dyn Controller>, WardenError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self, context: &Arc<PluginContext>) -> Result<Box<dyn Controller>, WardenError> {
        (self.factory)(context)
    }
}

impl std::fmt::Debug for ControllerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSpec")
            .field("name", &self.name)
            .finish()
    }
}

/// One route-producing method of a controller.
#[derive(Clone)]
pub struct RouteMethod {
    pub name: String,
    /// Method-level paths; empty means the controller's base path itself.
    pub paths: Vec<String>,
    /// Empty means every HTTP method.
    pub methods: Vec<HttpMethod>,
    pub handler: Arc<dyn RouteHandler>,
}

impl RouteMethod {
    pub fn new(name: impl Into<String>, handler: impl RouteHandler + 'static) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            methods: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }
}

impl std::fmt::Debug for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMethod")
            .field("name", &self.name)
            .field("paths", &self.paths)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Route metadata of a controller: base paths and route methods.
#[derive(Debug, Clone, Default)]
pub struct ControllerRoutes {
    pub base_paths: Vec<String>,
    pub methods: Vec<RouteMethod>,
}

impl ControllerRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class-level path.
    pub fn base(mut self, path: impl Into<String>) -> Self {
        self.base_paths.push(path.into());
        self
    }

    pub fn route(mut self, method: RouteMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn get(self, name: &str, path: &str, handler: impl RouteHandler + 'static) -> Self {
        self.route(RouteMethod::new(name, handler).path(path).method(HttpMethod::Get))
    }

    pub fn post(self, name: &str, path: &str, handler: impl RouteHandler + 'static) -> Self {
        self.route(RouteMethod::new(name, handler).path(path).method(HttpMethod::Post))
    }

    pub fn put(self, name: &str, path: &str, handler: impl RouteHandler + 'static) -> Self {
        self.route(RouteMethod::new(name, handler).path(path).method(HttpMethod::Put))
    }

    pub fn delete(self, name: &str, path: &str, handler: impl RouteHandler + 'static) -> Self {
        self.route(RouteMethod::new(name, handler).path(path).method(HttpMethod::Delete))
    }

    /// A route method answering every HTTP method.
    pub fn any(self, name: &str, path: &str, handler: impl RouteHandler + 'static) -> Self {
        self.route(RouteMethod::new(name, handler).path(path))
    }
}
