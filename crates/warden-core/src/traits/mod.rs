// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits at the seams between plugins, the runtime, and the host.

pub mod controller;
pub mod dispatcher;
pub mod plugin;
pub mod store;

pub use controller::{Controller, ControllerRoutes, ControllerSpec, RouteHandler, RouteMethod};
pub use dispatcher::RouteDispatcher;
pub use plugin::{Plugin, RouteContributor};
pub use store::PluginStore;
