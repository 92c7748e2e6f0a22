// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture plugins and controllers with observable lifecycle counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use warden_core::{
    Controller, ControllerRoutes, ControllerSpec, Plugin, PluginContext, PluginRequest,
    PluginResponse, RouteContributor, WardenError,
};

/// Counts every lifecycle hook a fixture sees, shared across instances.
#[derive(Debug, Default)]
pub struct LifecycleCounters {
    instances: AtomicUsize,
    initialized: AtomicUsize,
    stopped: AtomicUsize,
    destroyed: AtomicUsize,
    attached: AtomicUsize,
    detached: AtomicUsize,
    closed: AtomicUsize,
    last_context: Mutex<Option<Arc<PluginContext>>>,
}

impl LifecycleCounters {
    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }

    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Controller `attach(Some(_))` calls.
    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    /// Controller `attach(None)` calls.
    pub fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// The context passed to the most recent `initialize`.
    pub fn last_context(&self) -> Option<Arc<PluginContext>> {
        self.last_context.lock().expect("lock").clone()
    }
}

/// Recipe for [`FixturePlugin`] instances; `factory()` hands out fresh ones.
#[derive(Clone, Default)]
pub struct PluginFixture {
    counters: Arc<LifecycleCounters>,
    controllers: Vec<ControllerSpec>,
    contributes_routes: bool,
    api_prefix: Option<String>,
    defaults: Map<String, Value>,
    fail_initialize: bool,
    fail_stop: bool,
    panic_destroy: bool,
}

impl PluginFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Arc<LifecycleCounters> {
        self.counters.clone()
    }

    pub fn with_controller(mut self, spec: ControllerSpec) -> Self {
        self.controllers.push(spec);
        self.contributes_routes = true;
        self
    }

    /// Contribute routes even with no controllers.
    pub fn contributing_routes(mut self) -> Self {
        self.contributes_routes = true;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = Some(prefix.to_string());
        self.contributes_routes = true;
        self
    }

    pub fn with_default(mut self, key: &str, value: Value) -> Self {
        self.defaults.insert(key.to_string(), value);
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn panicking_destroy(mut self) -> Self {
        self.panic_destroy = true;
        self
    }

    /// A factory suitable for `ExportTable::plugin` or a host scope.
    pub fn factory(&self) -> impl Fn() -> Box<dyn Plugin> + Send + Sync + 'static {
        let fixture = self.clone();
        move || {
            let serial = fixture.counters.instances.fetch_add(1, Ordering::SeqCst) + 1;
            Box::new(FixturePlugin {
                fixture: fixture.clone(),
                serial,
            })
        }
    }
}

/// Plugin whose behaviour is driven by a [`PluginFixture`].
pub struct FixturePlugin {
    fixture: PluginFixture,
    serial: usize,
}

impl FixturePlugin {
    /// 1-based creation order among instances of the same fixture.
    pub fn serial(&self) -> usize {
        self.serial
    }
}

impl Plugin for FixturePlugin {
    fn initialize(&self, context: Arc<PluginContext>) -> Result<(), WardenError> {
        let counters = &self.fixture.counters;
        counters.initialized.fetch_add(1, Ordering::SeqCst);
        *counters.last_context.lock().expect("lock") = Some(context.clone());
        if self.fixture.fail_initialize {
            return Err(WardenError::lifecycle(
                context.plugin_id(),
                "initialize",
                "fixture refused to start",
            ));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), WardenError> {
        self.fixture.counters.stopped.fetch_add(1, Ordering::SeqCst);
        if self.fixture.fail_stop {
            return Err(WardenError::Internal("fixture stop failed".into()));
        }
        Ok(())
    }

    fn destroy(&self) -> Result<(), WardenError> {
        self.fixture.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.fixture.panic_destroy {
            panic!("fixture destroy panicked");
        }
        Ok(())
    }

    fn default_configuration(&self) -> Map<String, Value> {
        self.fixture.defaults.clone()
    }

    fn as_route_contributor(&self) -> Option<&dyn RouteContributor> {
        if self.fixture.contributes_routes {
            Some(self)
        } else {
            None
        }
    }
}

impl RouteContributor for FixturePlugin {
    fn controllers(&self) -> Vec<ControllerSpec> {
        self.fixture.controllers.clone()
    }

    fn api_prefix(&self) -> Option<String> {
        self.fixture.api_prefix.clone()
    }
}

/// Controller serving a fixed route table and counting its hooks.
pub struct FixtureController {
    routes: ControllerRoutes,
    counters: Arc<LifecycleCounters>,
    fail_close: bool,
}

impl Controller for FixtureController {
    fn routes(&self) -> ControllerRoutes {
        self.routes.clone()
    }

    fn attach(&self, context: Option<Arc<PluginContext>>) {
        let counter = match context {
            Some(_) => &self.counters.attached,
            None => &self.counters.detached,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) -> Result<(), WardenError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(WardenError::Internal("fixture close failed".into()));
        }
        Ok(())
    }
}

/// A controller spec producing a [`FixtureController`] with `routes`.
pub fn controller(
    name: &str,
    counters: Arc<LifecycleCounters>,
    routes: ControllerRoutes,
) -> ControllerSpec {
    build_controller(name, counters, routes, false)
}

/// Like [`controller`], but `close()` returns an error.
pub fn controller_failing_close(
    name: &str,
    counters: Arc<LifecycleCounters>,
    routes: ControllerRoutes,
) -> ControllerSpec {
    build_controller(name, counters, routes, true)
}

fn build_controller(
    name: &str,
    counters: Arc<LifecycleCounters>,
    routes: ControllerRoutes,
    fail_close: bool,
) -> ControllerSpec {
    ControllerSpec::new(name, move |_ctx: &Arc<PluginContext>| {
        Ok(Box::new(FixtureController {
            routes: routes.clone(),
            counters: counters.clone(),
            fail_close,
        }) as Box<dyn Controller>)
    })
}

/// A controller spec whose construction fails.
pub fn failing_controller(name: &str) -> ControllerSpec {
    let owned = name.to_string();
    ControllerSpec::new(name, move |_ctx: &Arc<PluginContext>| {
        Err(WardenError::Internal(format!(
            "controller {owned} could not be constructed"
        )))
    })
}

/// A controller spec whose construction panics.
pub fn panicking_controller(name: &str) -> ControllerSpec {
    ControllerSpec::new(
        name,
        |_ctx: &Arc<PluginContext>| -> Result<Box<dyn Controller>, WardenError> {
            panic!("controller constructor panicked")
        },
    )
}

/// Handler answering 200 with a fixed body.
pub fn text_handler(body: &str) -> impl Fn(PluginRequest) -> PluginResponse + Send + Sync + 'static {
    let body = body.to_string();
    move |_req| PluginResponse::text(200, body.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_creates_numbered_instances() {
        let fixture = PluginFixture::new();
        let factory = fixture.factory();
        let _a = factory();
        let _b = factory();
        assert_eq!(fixture.counters().instances(), 2);
    }

    #[test]
    fn route_contribution_follows_fixture() {
        let plain = PluginFixture::new().factory()();
        assert!(plain.as_route_contributor().is_none());

        let routed = PluginFixture::new().with_prefix("/x").factory()();
        let contributor = routed.as_route_contributor().unwrap();
        assert_eq!(contributor.api_prefix().as_deref(), Some("/x"));
        assert!(contributor.controllers().is_empty());
    }
}
