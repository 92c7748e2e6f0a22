// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Warden plugin runtime.

use thiserror::Error;

/// The primary error type used across the plugin contract and runtime.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Plugin descriptor is missing, unreadable, or invalid.
    #[error("invalid plugin descriptor: {0}")]
    Descriptor(String),

    /// A plugin with this id is already loaded.
    #[error("plugin already loaded: {0}")]
    DuplicatePlugin(String),

    /// A name could not be resolved in a module scope or its parent.
    #[error("cannot resolve `{name}`: {message}")]
    Resolution { name: String, message: String },

    /// The module scope has been closed and can no longer resolve names.
    #[error("module scope closed: {0}")]
    ScopeClosed(String),

    /// The resolved entry point does not satisfy the plugin contract.
    #[error("`{0}` is not a plugin entry point")]
    NotAPlugin(String),

    /// A plugin lifecycle hook failed.
    #[error("plugin {plugin_id} failed during {phase}: {message}")]
    Lifecycle {
        plugin_id: String,
        phase: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Route declaration or controller construction failed.
    #[error("route error: {0}")]
    Route(String),

    /// A route overlaps one that is already registered with the dispatcher.
    #[error("route conflict: {method} {path} is already mapped")]
    RouteConflict { method: String, path: String },

    /// Plugin store errors (artifact persistence, deletion).
    #[error("plugin store error: {message}")]
    Store {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested plugin is not loaded.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// Filesystem errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Build a lifecycle error for a plugin hook.
    pub fn lifecycle(
        plugin_id: impl Into<String>,
        phase: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Lifecycle {
            plugin_id: plugin_id.into(),
            phase: phase.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Build a store error carrying its underlying cause.
    pub fn store(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
