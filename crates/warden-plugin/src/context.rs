// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Construction of a plugin's [`PluginContext`].

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use warden_core::{HostServices, PluginContext};

use crate::descriptor::PluginDescriptor;

/// Merge configuration layers key by key. Later layers win.
///
/// Order: plugin defaults, then descriptor values, then host overrides.
pub fn merge_configuration(
    defaults: Map<String, Value>,
    descriptor: &Map<String, Value>,
    overrides: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut merged = defaults;
    for (key, value) in descriptor {
        merged.insert(key.clone(), value.clone());
    }
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Build the context for a freshly instantiated plugin.
pub fn build_context(
    descriptor: &PluginDescriptor,
    defaults: Map<String, Value>,
    overrides: Option<&Map<String, Value>>,
    data_root: &Path,
    host: Arc<dyn HostServices>,
) -> PluginContext {
    let configuration = merge_configuration(defaults, &descriptor.configuration, overrides);
    PluginContext::new(
        descriptor.id.clone(),
        configuration,
        data_root.join(&descriptor.id),
        host,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::ServiceRegistry;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn overrides_beat_descriptor_beat_defaults() {
        let merged = merge_configuration(
            map(json!({"a": 1, "b": 1, "c": 1})),
            &map(json!({"b": 2, "c": 2})),
            Some(&map(json!({"c": 3}))),
        );
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
        assert_eq!(merged["c"], 3);
    }

    #[test]
    fn data_directory_is_scoped_by_id() {
        let descriptor = crate::descriptor::parse_descriptor(
            "[plugin]\nid = \"billing\"\nentry_point = \"x\"\n",
        )
        .unwrap();
        let ctx = build_context(
            &descriptor,
            Map::new(),
            None,
            Path::new("/srv/data"),
            Arc::new(ServiceRegistry::new()),
        );
        assert_eq!(ctx.data_directory(), Path::new("/srv/data/billing"));
        assert_eq!(ctx.plugin_id(), "billing");
    }
}
