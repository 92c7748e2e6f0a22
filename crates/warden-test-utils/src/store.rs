// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`PluginStore`] backed by a temporary directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;
use warden_core::{PluginStore, WardenError};

/// Stores artifacts as `<dir>/<id>.zip`. The directory is removed on drop.
pub struct TempPluginStore {
    dir: TempDir,
    fail_writes: AtomicBool,
}

impl TempPluginStore {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp store"),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Make `store_plugin` fail with an I/O error from now on.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn artifact(&self, id: &str) -> PathBuf {
        self.dir.path().join(format!("{id}.zip"))
    }
}

impl Default for TempPluginStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginStore for TempPluginStore {
    fn list_plugin_ids(&self) -> Result<Vec<String>, WardenError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "zip")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn plugin_path(&self, id: &str) -> Option<PathBuf> {
        let path = self.artifact(id);
        path.is_file().then_some(path)
    }

    fn store_plugin(&self, id: &str, bytes: &[u8]) -> Result<PathBuf, WardenError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WardenError::store(
                format!("cannot store plugin {id}"),
                std::io::Error::other("store is read-only"),
            ));
        }
        let path = self.artifact(id);
        std::fs::write(&path, bytes)
            .map_err(|e| WardenError::store(format!("cannot store plugin {id}"), e))?;
        Ok(path)
    }

    fn delete_plugin(&self, id: &str) -> Result<bool, WardenError> {
        let path = self.artifact(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .map_err(|e| WardenError::store(format!("cannot delete plugin {id}"), e))?;
        Ok(true)
    }
}
