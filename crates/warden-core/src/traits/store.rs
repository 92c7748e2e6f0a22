// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent storage of plugin artifacts.

use std::path::PathBuf;

use crate::error::WardenError;

/// Persists plugin artifacts and maps ids to local paths.
pub trait PluginStore: Send + Sync {
    /// Ids of every stored plugin.
    fn list_plugin_ids(&self) -> Result<Vec<String>, WardenError>;

    /// Local path of the artifact for `id`, if stored.
    fn plugin_path(&self, id: &str) -> Option<PathBuf>;

    /// Persist `bytes` as the artifact for `id` and return its path.
    fn store_plugin(&self, id: &str, bytes: &[u8]) -> Result<PathBuf, WardenError>;

    /// Delete the artifact for `id`. Returns `false` when nothing was stored.
    fn delete_plugin(&self, id: &str) -> Result<bool, WardenError>;
}
