// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The entry-point contract every plugin implements.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::PluginContext;
use crate::error::WardenError;
use crate::traits::controller::ControllerSpec;

/// A dynamically loaded extension module.
///
/// Hooks take `&self`; plugins keep mutable state behind their own locks.
pub trait Plugin: Send + Sync {
    /// Called once after the runtime record and context exist.
    fn initialize(&self, context: Arc<PluginContext>) -> Result<(), WardenError>;

    /// First shutdown hook. Errors are logged, never fatal to the unload.
    fn stop(&self) -> Result<(), WardenError> {
        Ok(())
    }

    /// Final shutdown hook, called after [`stop`](Self::stop) even if it failed.
    fn destroy(&self) -> Result<(), WardenError> {
        Ok(())
    }

    /// Lowest-precedence configuration layer.
    fn default_configuration(&self) -> Map<String, Value> {
        Map::new()
    }

    /// `Some` when the plugin also contributes HTTP routes.
    fn as_route_contributor(&self) -> Option<&dyn RouteContributor> {
        None
    }
}

/// Optional capability: a plugin that exposes HTTP controllers.
pub trait RouteContributor: Send + Sync {
    /// Controllers to instantiate, in registration order.
    fn controllers(&self) -> Vec<ControllerSpec>;

    /// Prefix for every route; `None` or empty means `/api/plugins/<id>`.
    fn api_prefix(&self) -> Option<String> {
        None
    }
}
