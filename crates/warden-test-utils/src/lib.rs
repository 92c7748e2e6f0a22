// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Warden integration tests.
//!
//! - [`ArtifactBuilder`] - writes plugin artifacts (zip + `plugin.toml`)
//! - [`RecordingDispatcher`] - in-memory route dispatcher with failure injection
//! - [`PluginFixture`] - configurable plugin with lifecycle counters
//! - [`TempPluginStore`] - plugin store backed by a temporary directory

pub mod artifact;
pub mod dispatcher;
pub mod plugins;
pub mod store;

pub use artifact::ArtifactBuilder;
pub use dispatcher::RecordingDispatcher;
pub use plugins::{
    FixtureController, FixturePlugin, LifecycleCounters, PluginFixture, controller,
    controller_failing_close, failing_controller, panicking_controller, text_handler,
};
pub use store::TempPluginStore;
