// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named exports a module publishes to the runtime.
//!
//! A native plugin library exposes one Rust-ABI function under
//! [`EXPORTS_SYMBOL`] that fills an [`ExportTable`]; use [`export_plugins!`]
//! to generate it together with the library's allocator bridge (see
//! [`crate::allocator`]). The host fills a table of its own for entry points
//! that are compiled in. Native plugins must be built with the same toolchain
//! and the same `warden-core` version as the host.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::plugin::Plugin;

/// Symbol a native plugin library must export.
pub const EXPORTS_SYMBOL: &[u8] = b"warden_plugin_exports";

/// Signature of the function behind [`EXPORTS_SYMBOL`].
pub type ExportsFn = fn(&mut ExportTable);

/// Creates a fresh plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Something a module makes resolvable by name.
#[derive(Clone)]
pub enum Export {
    /// An entry point satisfying the plugin contract.
    Plugin(PluginFactory),
    /// Any other shared value; not instantiable as a plugin.
    Value(Arc<dyn Any + Send + Sync>),
}

impl Export {
    pub fn kind(&self) -> &'static str {
        match self {
            Export::Plugin(_) => "plugin",
            Export::Value(_) => "value",
        }
    }

    pub fn into_plugin_factory(self) -> Option<PluginFactory> {
        match self {
            Export::Plugin(factory) => Some(factory),
            Export::Value(_) => None,
        }
    }
}

impl std::fmt::Debug for Export {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Export::{}", self.kind())
    }
}

/// Name-keyed exports of one module.
#[derive(Debug, Default)]
pub struct ExportTable {
    entries: HashMap<String, Export>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a plugin entry point under `name`.
    pub fn plugin<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Export::Plugin(Arc::new(factory)));
    }

    /// Export a plain value under `name`.
    pub fn value<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries
            .insert(name.into(), Export::Value(Arc::new(value)));
    }

    pub fn insert(&mut self, name: impl Into<String>, export: Export) -> Option<Export> {
        self.entries.insert(name.into(), export)
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Move `other` into this table. Existing names are kept; the names that
    /// were skipped are returned.
    pub fn merge(&mut self, other: ExportTable) -> Vec<String> {
        let mut skipped = Vec::new();
        for (name, export) in other.entries {
            if self.entries.contains_key(&name) {
                skipped.push(name);
            } else {
                self.entries.insert(name, export);
            }
        }
        skipped.sort();
        skipped
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Generate the exports function of a native plugin library.
///
/// Also installs [`PluginAllocator`](crate::allocator::PluginAllocator) as the
/// library's global allocator and exports the hook the host uses to connect
/// it, so invoke it once per library and declare no other global allocator.
///
/// ```ignore
/// warden_core::export_plugins! {
///     "billing.BillingPlugin" => BillingPlugin::default(),
/// }
/// ```
#[macro_export]
macro_rules! export_plugins {
    ($($name:expr => $plugin:expr),+ $(,)?) => {
        #[global_allocator]
        static WARDEN_PLUGIN_ALLOCATOR: $crate::allocator::PluginAllocator =
            $crate::allocator::PluginAllocator;

        /// # Safety
        ///
        /// Called by the host once, right after loading the library.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn warden_plugin_allocator(
            host: *const $crate::allocator::HostAllocator,
        ) {
            unsafe { $crate::allocator::PluginAllocator::install(host) }
        }

        #[unsafe(no_mangle)]
        pub fn warden_plugin_exports(table: &mut $crate::exports::ExportTable) {
            $(
                table.plugin($name, || {
                    ::std::boxed::Box::new($plugin)
                        as ::std::boxed::Box<dyn $crate::traits::Plugin>
                });
            )+
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PluginContext;
    use crate::error::WardenError;

    #[derive(Default)]
    struct Demo;

    impl Plugin for Demo {
        fn initialize(&self, _context: Arc<PluginContext>) -> Result<(), WardenError> {
            Ok(())
        }
    }

    mod generated {
        use super::Demo;
        crate::export_plugins! {
            "demo.Demo" => Demo,
            "demo.Other" => Demo::default(),
        }
    }

    #[test]
    fn macro_generates_exports_function() {
        let mut table = ExportTable::new();
        generated::warden_plugin_exports(&mut table);
        assert_eq!(table.names(), vec!["demo.Demo", "demo.Other"]);
        let factory = table.get("demo.Demo").cloned().unwrap().into_plugin_factory();
        assert!(factory.is_some());
    }

    #[test]
    fn exports_fn_signature_matches_macro() {
        let _hook: crate::allocator::AllocatorHookFn = generated::warden_plugin_allocator;
        let f: ExportsFn = generated::warden_plugin_exports;
        let mut table = ExportTable::new();
        f(&mut table);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn values_are_not_plugins() {
        let mut table = ExportTable::new();
        table.value("demo.Config", 5u8);
        let export = table.get("demo.Config").cloned().unwrap();
        assert_eq!(export.kind(), "value");
        assert!(export.into_plugin_factory().is_none());
    }

    #[test]
    fn merge_keeps_first_definition() {
        let mut first = ExportTable::new();
        first.value("shared", 1u8);
        let mut second = ExportTable::new();
        second.plugin("shared", || Box::new(Demo) as Box<dyn Plugin>);
        second.value("extra", 2u8);

        let skipped = first.merge(second);
        assert_eq!(skipped, vec!["shared".to_string()]);
        assert_eq!(first.get("shared").unwrap().kind(), "value");
        assert!(first.contains("extra"));

        first.clear();
        assert!(first.is_empty());
    }
}
