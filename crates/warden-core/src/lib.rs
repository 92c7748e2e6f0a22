// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Warden plugin runtime.
//!
//! This crate is the contract between plugins and the host: the entry-point
//! and controller traits, the [`PluginContext`] capability handle, the export
//! table native plugin libraries fill, and the error and common types shared
//! by the runtime and the gateway.

pub mod allocator;
pub mod context;
pub mod error;
pub mod exports;
pub mod routing;
pub mod services;
pub mod traits;
pub mod types;

pub use context::{LogLevel, PluginContext, ServiceLookupError};
pub use error::WardenError;
pub use exports::{Export, ExportTable, PluginFactory};
pub use services::{HostServices, ServiceRegistry};
pub use types::{EndpointInfo, HttpMethod, PluginRequest, PluginResponse, PluginState, RouteKey};

pub use traits::{
    Controller, ControllerRoutes, ControllerSpec, Plugin, PluginStore, RouteContributor,
    RouteDispatcher, RouteHandler, RouteMethod,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warden_error_variants_render() {
        let cases: Vec<(WardenError, &str)> = vec![
            (WardenError::Config("bad".into()), "configuration error: bad"),
            (
                WardenError::Descriptor("no plugin.toml".into()),
                "invalid plugin descriptor: no plugin.toml",
            ),
            (
                WardenError::DuplicatePlugin("billing".into()),
                "plugin already loaded: billing",
            ),
            (
                WardenError::Resolution {
                    name: "x.Y".into(),
                    message: "not exported".into(),
                },
                "cannot resolve `x.Y`: not exported",
            ),
            (
                WardenError::NotAPlugin("x.Y".into()),
                "`x.Y` is not a plugin entry point",
            ),
            (
                WardenError::lifecycle("billing", "stop", "boom"),
                "plugin billing failed during stop: boom",
            ),
            (
                WardenError::RouteConflict {
                    method: "GET".into(),
                    path: "/a".into(),
                },
                "route conflict: GET /a is already mapped",
            ),
            (
                WardenError::PluginNotFound("nope".into()),
                "plugin not found: nope",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn store_error_keeps_source() {
        use std::error::Error as _;
        let err = WardenError::store("write failed", std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "plugin store error: write failed");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin<T: Plugin>() {}
        fn _assert_contributor<T: RouteContributor>() {}
        fn _assert_controller<T: Controller>() {}
        fn _assert_dispatcher<T: RouteDispatcher>() {}
        fn _assert_store<T: PluginStore>() {}
        fn _assert_host<T: HostServices>() {}
        _assert_host::<ServiceRegistry>();
    }
}
