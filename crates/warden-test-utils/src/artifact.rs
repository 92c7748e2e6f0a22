// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builder for on-disk plugin artifacts.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use zip::ZipWriter;
use zip::write::FileOptions;

/// Builds a zip artifact with a generated `plugin.toml`.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    id: String,
    plugin: toml::Table,
    configuration: toml::Table,
    manifest_path: Option<String>,
    raw_manifest: Option<String>,
    files: Vec<(String, Vec<u8>)>,
}

impl ArtifactBuilder {
    /// A minimal descriptor: `id` plus `entry_point`.
    pub fn new(id: &str, entry_point: &str) -> Self {
        let mut plugin = toml::Table::new();
        plugin.insert("id".into(), toml::Value::String(id.to_string()));
        plugin.insert(
            "entry_point".into(),
            toml::Value::String(entry_point.to_string()),
        );
        Self {
            id: id.to_string(),
            plugin,
            configuration: toml::Table::new(),
            manifest_path: Some("plugin.toml".to_string()),
            raw_manifest: None,
            files: Vec::new(),
        }
    }

    pub fn version(self, version: &str) -> Self {
        self.field("version", toml::Value::String(version.to_string()))
    }

    pub fn host_version(self, requirement: &str) -> Self {
        self.field("host_version", toml::Value::String(requirement.to_string()))
    }

    /// Declare that every file in the sibling `<id>-lib` directory is a library.
    pub fn all_libraries(self) -> Self {
        self.field("libraries", toml::Value::Boolean(true))
    }

    /// Declare the named files in `<id>-lib` as libraries.
    pub fn libraries(self, names: &[&str]) -> Self {
        let list = names
            .iter()
            .map(|n| toml::Value::String((*n).to_string()))
            .collect();
        self.field("libraries", toml::Value::Array(list))
    }

    /// Set an arbitrary `[plugin]` field.
    pub fn field(mut self, key: &str, value: toml::Value) -> Self {
        self.plugin.insert(key.to_string(), value);
        self
    }

    /// Add a `[configuration]` entry. Nulls are not representable in TOML and are skipped.
    pub fn config(mut self, key: &str, value: Value) -> Self {
        if let Some(value) = json_to_toml(value) {
            self.configuration.insert(key.to_string(), value);
        }
        self
    }

    /// Store the manifest under another archive path, e.g. `META-INF/plugin.toml`.
    pub fn manifest_at(mut self, path: &str) -> Self {
        self.manifest_path = Some(path.to_string());
        self
    }

    /// Replace the generated manifest with literal text.
    pub fn raw_manifest(mut self, text: &str) -> Self {
        self.raw_manifest = Some(text.to_string());
        self
    }

    /// Produce an archive with no manifest at all.
    pub fn without_manifest(mut self) -> Self {
        self.manifest_path = None;
        self
    }

    /// Add an extra archive entry.
    pub fn file(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.to_string(), contents.into()));
        self
    }

    pub fn manifest_text(&self) -> String {
        if let Some(raw) = &self.raw_manifest {
            return raw.clone();
        }
        let mut doc = toml::Table::new();
        doc.insert("plugin".into(), toml::Value::Table(self.plugin.clone()));
        if !self.configuration.is_empty() {
            doc.insert(
                "configuration".into(),
                toml::Value::Table(self.configuration.clone()),
            );
        }
        toml::to_string(&doc).expect("manifest serializes")
    }

    /// The archive bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        if let Some(path) = &self.manifest_path {
            writer
                .start_file(path.as_str(), FileOptions::default())
                .expect("start manifest entry");
            writer
                .write_all(self.manifest_text().as_bytes())
                .expect("write manifest");
        }
        for (name, contents) in &self.files {
            writer
                .start_file(name.as_str(), FileOptions::default())
                .expect("start entry");
            writer.write_all(contents).expect("write entry");
        }
        writer.finish().expect("finish archive").into_inner()
    }

    /// Write the archive to `<dir>/<id>.zip` and return its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        self.write_as(dir, &format!("{}.zip", self.id))
    }

    /// Write the archive to `<dir>/<file_name>`.
    pub fn write_as(&self, dir: &Path, file_name: &str) -> PathBuf {
        std::fs::create_dir_all(dir).expect("create artifact dir");
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_bytes()).expect("write artifact");
        path
    }
}

/// Write a library archive into `<dir>/<id>-lib/<name>`.
pub fn write_library(dir: &Path, id: &str, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let lib_dir = dir.join(format!("{id}-lib"));
    std::fs::create_dir_all(&lib_dir).expect("create lib dir");
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (entry, contents) in entries {
        writer
            .start_file(*entry, FileOptions::default())
            .expect("start entry");
        writer.write_all(contents).expect("write entry");
    }
    let bytes = writer.finish().expect("finish archive").into_inner();
    let path = lib_dir.join(name);
    std::fs::write(&path, bytes).expect("write library");
    path
}

fn json_to_toml(value: Value) -> Option<toml::Value> {
    Some(match value {
        Value::Null => return None,
        Value::Bool(b) => toml::Value::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => toml::Value::Integer(i),
            None => toml::Value::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => toml::Value::String(s),
        Value::Array(items) => {
            toml::Value::Array(items.into_iter().filter_map(json_to_toml).collect())
        }
        Value::Object(map) => toml::Value::Table(
            map.into_iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k, v)))
                .collect(),
        ),
    })
}
