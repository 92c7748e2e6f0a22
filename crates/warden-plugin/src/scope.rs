// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-plugin isolation boundary.
//!
//! A [`ModuleScope`] owns everything a plugin brought with it: open handles on
//! its artifact and library archives, the native libraries extracted from
//! them, and the export table those libraries published. Names it cannot
//! resolve are delegated to the [`HostScope`], which holds entry points
//! compiled into the host binary.
//!
//! Closing a scope is explicit and deterministic: exports are dropped and
//! archives closed at once. Native libraries are unloaded when the last
//! [`CodeLease`] on them drops, so route handlers still held by an in-flight
//! request keep their code mapped. The scratch directory goes with them.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use libloading::Library;
use tempfile::TempDir;
use tracing::{debug, warn};
use warden_core::allocator::{ALLOCATOR_SYMBOL, AllocatorHookFn, HOST_ALLOCATOR};
use warden_core::exports::{EXPORTS_SYMBOL, ExportsFn};
use warden_core::{
    Export, ExportTable, Plugin, PluginRequest, PluginResponse, RouteHandler, WardenError,
};
use zip::ZipArchive;

/// Archive directory holding native libraries.
const NATIVE_DIR: &str = "native/";

/// Exports provided by the host itself; the parent of every module scope.
#[derive(Default)]
pub struct HostScope {
    exports: DashMap<String, Export>,
}

impl HostScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a plugin entry point available to every artifact under `name`.
    pub fn register_plugin<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.exports
            .insert(name.into(), Export::Plugin(Arc::new(factory)));
    }

    pub fn register(&self, name: impl Into<String>, export: Export) {
        self.exports.insert(name.into(), export);
    }

    pub fn resolve(&self, name: &str) -> Option<Export> {
        self.exports.get(name).map(|e| e.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }
}

impl std::fmt::Debug for HostScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostScope")
            .field("exports", &self.exports.len())
            .finish()
    }
}

/// Native libraries of one scope and the directory they were extracted to.
struct NativeCode {
    plugin_id: String,
    libraries: Vec<Library>,
    scratch: Option<TempDir>,
}

impl NativeCode {
    fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            libraries: Vec::new(),
            scratch: None,
        }
    }
}

impl Drop for NativeCode {
    fn drop(&mut self) {
        let count = self.libraries.len();
        for library in self.libraries.drain(..).rev() {
            if let Err(e) = library.close() {
                warn!(plugin_id = %self.plugin_id, error = %e, "failed to unload native library");
            }
        }
        if count > 0 {
            debug!(plugin_id = %self.plugin_id, libraries = count, "native libraries unloaded");
        }
    }
}

/// Keeps a scope's native libraries loaded while it is alive.
///
/// The default lease holds nothing, for plugins compiled into the host.
#[derive(Clone, Default)]
pub struct CodeLease(Option<Arc<NativeCode>>);

impl CodeLease {
    /// Whether this lease keeps any native library loaded.
    pub fn holds_native_code(&self) -> bool {
        self.0.as_ref().is_some_and(|code| !code.libraries.is_empty())
    }

    /// Number of leases on the same libraries, this one included.
    pub fn holders(&self) -> usize {
        self.0.as_ref().map_or(0, Arc::strong_count)
    }

    /// Wrap `handler` so it keeps this lease until it is dropped.
    pub fn hold(&self, handler: Arc<dyn RouteHandler>) -> Arc<dyn RouteHandler> {
        if !self.holds_native_code() {
            return handler;
        }
        Arc::new(LeasedHandler {
            handler,
            _code: self.clone(),
        })
    }
}

impl std::fmt::Debug for CodeLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeLease")
            .field("native", &self.holds_native_code())
            .field("holders", &self.holders())
            .finish()
    }
}

/// A route handler pinned to the library its code lives in.
/// Field order is drop order.
struct LeasedHandler {
    handler: Arc<dyn RouteHandler>,
    _code: CodeLease,
}

#[async_trait]
impl RouteHandler for LeasedHandler {
    async fn handle(&self, request: PluginRequest) -> PluginResponse {
        self.handler.handle(request).await
    }
}

/// Resources owned by an open scope. Field order is drop order.
struct ScopeResources {
    exports: ExportTable,
    archives: Vec<ZipArchive<File>>,
    code: CodeLease,
}

/// The code-resolution scope of one plugin.
pub struct ModuleScope {
    plugin_id: String,
    parent: Arc<HostScope>,
    resources: RwLock<Option<ScopeResources>>,
}

impl ModuleScope {
    /// Open the artifact and its libraries and load any native code they carry.
    ///
    /// A library path with the platform's dynamic-library extension is loaded
    /// directly; anything else is opened as an archive.
    pub fn open(
        plugin_id: &str,
        artifact: &Path,
        libraries: &[PathBuf],
        parent: Arc<HostScope>,
    ) -> Result<Self, WardenError> {
        // Declared first so it drops last if opening fails midway.
        let mut code = NativeCode::new(plugin_id);
        let mut exports = ExportTable::new();
        let mut archives = Vec::new();

        for path in std::iter::once(artifact).chain(libraries.iter().map(PathBuf::as_path)) {
            if is_native_library(path) {
                load_library(path, &mut code, &mut exports)?;
            } else {
                archives.push(open_archive(path, &mut code, &mut exports)?);
            }
        }

        debug!(
            plugin_id,
            archives = archives.len(),
            libraries = code.libraries.len(),
            exports = exports.len(),
            "module scope opened"
        );

        Ok(Self {
            plugin_id: plugin_id.to_string(),
            parent,
            resources: RwLock::new(Some(ScopeResources {
                exports,
                archives,
                code: CodeLease(Some(Arc::new(code))),
            })),
        })
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Resolve `name`: own exports first, then the host scope.
    pub fn resolve(&self, name: &str) -> Result<Export, WardenError> {
        let guard = self.resources.read().unwrap_or_else(|e| e.into_inner());
        let resources = guard
            .as_ref()
            .ok_or_else(|| WardenError::ScopeClosed(self.plugin_id.clone()))?;

        if let Some(export) = resources.exports.get(name) {
            return Ok(export.clone());
        }
        self.parent
            .resolve(name)
            .ok_or_else(|| WardenError::Resolution {
                name: name.to_string(),
                message: format!(
                    "not exported by plugin {} or by the host",
                    self.plugin_id
                ),
            })
    }

    /// A lease on this scope's native libraries; empty once closed.
    pub fn lease(&self) -> CodeLease {
        let guard = self.resources.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .map(|r| r.code.clone())
            .unwrap_or_default()
    }

    /// Names exported by this scope's own libraries, sorted.
    pub fn export_names(&self) -> Vec<String> {
        let guard = self.resources.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .map(|r| r.exports.names())
            .unwrap_or_default()
    }

    pub fn archive_count(&self) -> usize {
        let guard = self.resources.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map_or(0, |r| r.archives.len())
    }

    pub fn library_count(&self) -> usize {
        let guard = self.resources.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .and_then(|r| r.code.0.as_ref())
            .map_or(0, |code| code.libraries.len())
    }

    pub fn is_closed(&self) -> bool {
        self.resources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Release every resource. Returns false if the scope was already closed.
    ///
    /// Plugin instances created from this scope must be dropped first. Native
    /// libraries stay loaded until outstanding [`CodeLease`]s are dropped too.
    pub fn close(&self) -> bool {
        let taken = self
            .resources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(ScopeResources {
            mut exports,
            archives,
            code,
        }) = taken
        else {
            return false;
        };

        exports.clear();
        drop(exports);
        drop(archives);
        let outstanding = code.holders().saturating_sub(1);
        if outstanding > 0 && code.holds_native_code() {
            debug!(plugin_id = %self.plugin_id, outstanding, "native code stays loaded until leased handlers drop");
        }
        drop(code);
        debug!(plugin_id = %self.plugin_id, "module scope closed");
        true
    }

    #[cfg(test)]
    pub(crate) fn insert_export(&self, name: &str, export: Export) {
        let mut guard = self.resources.write().unwrap_or_else(|e| e.into_inner());
        if let Some(resources) = guard.as_mut() {
            resources.exports.insert(name, export);
        }
    }
}

impl Drop for ModuleScope {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ModuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleScope")
            .field("plugin_id", &self.plugin_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn is_native_library(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
}

fn open_archive(
    path: &Path,
    code: &mut NativeCode,
    exports: &mut ExportTable,
) -> Result<ZipArchive<File>, WardenError> {
    let file = File::open(path).map_err(|e| WardenError::Resolution {
        name: path.display().to_string(),
        message: format!("cannot open: {e}"),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| WardenError::Resolution {
        name: path.display().to_string(),
        message: format!("not a valid archive: {e}"),
    })?;

    let native: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(NATIVE_DIR) && is_native_library(Path::new(name)))
        .map(str::to_string)
        .collect();

    for name in native {
        let extracted = extract_entry(&mut archive, &name, code)?;
        load_library(&extracted, code, exports)?;
    }

    Ok(archive)
}

/// Extract `name` into the scratch directory, keeping its path inside the
/// archive so same-named libraries in different folders stay apart.
fn extract_entry(
    archive: &mut ZipArchive<File>,
    name: &str,
    code: &mut NativeCode,
) -> Result<PathBuf, WardenError> {
    let extract_err = |message: String| WardenError::Resolution {
        name: name.to_string(),
        message,
    };

    if code.scratch.is_none() {
        let dir = tempfile::Builder::new()
            .prefix(&format!("warden-{}-", code.plugin_id))
            .tempdir()
            .map_err(|e| extract_err(format!("cannot create scratch directory: {e}")))?;
        code.scratch = Some(dir);
    }
    let scratch = code
        .scratch
        .as_ref()
        .ok_or_else(|| WardenError::Internal("scratch directory missing".into()))?;

    let mut entry = archive
        .by_name(name)
        .map_err(|e| extract_err(format!("cannot read entry: {e}")))?;
    let relative = entry
        .enclosed_name()
        .map(Path::to_path_buf)
        .ok_or_else(|| extract_err("entry name escapes the archive".into()))?;

    let target = scratch.path().join(relative);
    if target.exists() {
        return Err(extract_err("duplicate native library entry".into()));
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| extract_err(format!("cannot extract: {e}")))?;
    }
    let mut out =
        File::create(&target).map_err(|e| extract_err(format!("cannot extract: {e}")))?;
    std::io::copy(&mut entry, &mut out).map_err(|e| extract_err(format!("cannot extract: {e}")))?;
    Ok(target)
}

fn load_library(
    path: &Path,
    code: &mut NativeCode,
    exports: &mut ExportTable,
) -> Result<(), WardenError> {
    let plugin_id = code.plugin_id.as_str();
    // SAFETY: running a plugin library's initialisers is inherently unsafe;
    // artifacts are trusted deployment units.
    let library = unsafe { Library::new(path) }.map_err(|e| WardenError::Resolution {
        name: path.display().to_string(),
        message: format!("cannot load native library: {e}"),
    })?;

    // SAFETY: both symbol types are the signatures `export_plugins!` generates.
    let hook = unsafe { library.get::<AllocatorHookFn>(ALLOCATOR_SYMBOL) }
        .ok()
        .map(|symbol| *symbol);
    let exports_fn = unsafe { library.get::<ExportsFn>(EXPORTS_SYMBOL) }
        .ok()
        .map(|symbol| *symbol);

    if let Some(hook) = hook {
        // SAFETY: `HOST_ALLOCATOR` is a static of the host, which outlives the
        // library, and no library code has run yet.
        unsafe { hook(&HOST_ALLOCATOR) };
    }

    match (exports_fn, hook) {
        (Some(_), None) => {
            return Err(WardenError::Resolution {
                name: path.display().to_string(),
                message: "library publishes exports without an allocator hook; build it with export_plugins!".into(),
            });
        }
        (Some(exports_fn), Some(_)) => {
            let mut table = ExportTable::new();
            exports_fn(&mut table);
            let skipped = exports.merge(table);
            for name in skipped {
                warn!(plugin_id, export = %name, library = %path.display(), "duplicate export ignored");
            }
        }
        (None, _) => debug!(plugin_id, library = %path.display(), "library publishes no exports"),
    }

    code.libraries.push(library);
    Ok(())
}
