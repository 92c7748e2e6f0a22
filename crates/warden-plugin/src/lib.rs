// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin runtime for the Warden host.
//!
//! Loads plugin artifacts into isolated [`ModuleScope`]s, drives their
//! lifecycle through the [`PluginManager`], and maps the routes they
//! contribute onto the host dispatcher through the [`EndpointRegistry`].

pub mod context;
pub mod descriptor;
pub mod endpoints;
pub mod guard;
pub mod manager;
pub mod scope;

pub use descriptor::{
    Libraries, PluginDescriptor, parse_descriptor, read_descriptor, read_descriptor_bytes,
};
pub use endpoints::EndpointRegistry;
pub use manager::{
    HOST_VERSION, PluginInfo, PluginManager, PluginManagerConfig, PreparedPlugin, scan_artifacts,
};
pub use scope::{CodeLease, HostScope, ModuleScope};
