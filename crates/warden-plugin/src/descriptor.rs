// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin descriptor parsing from the `plugin.toml` embedded in an artifact.
//!
//! Parsing is tolerant: every `[plugin]` field is optional at the TOML level so
//! a partial manifest still yields a descriptor. [`PluginDescriptor::validate`]
//! then enforces what a load needs.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use warden_core::WardenError;
use zip::ZipArchive;

/// Archive entries searched for the manifest, in order.
pub const MANIFEST_PATHS: &[&str] = &["plugin.toml", "META-INF/plugin.toml"];

/// Extra dependency archives declared by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Libraries {
    #[default]
    None,
    /// Every file in `<id>-lib`.
    All,
    /// The named files in `<id>-lib`.
    Named(Vec<String>),
}

/// Identity and deployment metadata of a plugin artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: String,
    /// Export name of the plugin entry point.
    pub entry_point: String,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Semver requirement the host runtime version must satisfy.
    pub host_version: Option<String>,
    pub libraries: Libraries,
    /// Default configuration shipped in the descriptor.
    pub configuration: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    plugin: PluginSection,
    #[serde(default)]
    configuration: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct PluginSection {
    id: Option<String>,
    #[serde(alias = "plugin_class")]
    entry_point: Option<String>,
    version: Option<String>,
    description: Option<String>,
    host_version: Option<String>,
    libraries: Option<LibrariesField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LibrariesField {
    Flag(bool),
    Names(Vec<String>),
}

/// Parse a descriptor from `plugin.toml` content.
pub fn parse_descriptor(toml_content: &str) -> Result<PluginDescriptor, WardenError> {
    let file: ManifestFile = toml::from_str(toml_content)
        .map_err(|e| WardenError::Descriptor(format!("invalid plugin.toml: {e}")))?;

    let section = file.plugin;
    let libraries = match section.libraries {
        None | Some(LibrariesField::Flag(false)) => Libraries::None,
        Some(LibrariesField::Flag(true)) => Libraries::All,
        Some(LibrariesField::Names(names)) => Libraries::Named(names),
    };

    Ok(PluginDescriptor {
        id: section.id.unwrap_or_default().trim().to_string(),
        entry_point: section.entry_point.unwrap_or_default().trim().to_string(),
        version: section.version,
        description: section.description,
        host_version: section.host_version,
        libraries,
        configuration: file.configuration,
    })
}

/// Read the descriptor embedded in the artifact at `path`.
pub fn read_descriptor(path: &Path) -> Result<PluginDescriptor, WardenError> {
    let file = File::open(path).map_err(|e| {
        WardenError::Descriptor(format!("cannot open artifact {}: {e}", path.display()))
    })?;
    descriptor_from_archive(file, &path.display().to_string())
}

/// Read the descriptor of an artifact that is still in memory.
pub fn read_descriptor_bytes(bytes: &[u8]) -> Result<PluginDescriptor, WardenError> {
    descriptor_from_archive(Cursor::new(bytes), "uploaded artifact")
}

fn descriptor_from_archive<R: Read + Seek>(
    reader: R,
    label: &str,
) -> Result<PluginDescriptor, WardenError> {
    let mut archive = ZipArchive::new(reader).map_err(|e| {
        WardenError::Descriptor(format!("{label} is not a plugin archive: {e}"))
    })?;

    for name in MANIFEST_PATHS {
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => continue,
            Err(e) => {
                return Err(WardenError::Descriptor(format!(
                    "cannot read {name} in {label}: {e}"
                )));
            }
        };
        let mut content = String::new();
        entry.read_to_string(&mut content).map_err(|e| {
            WardenError::Descriptor(format!("cannot read {name} in {label}: {e}"))
        })?;
        return parse_descriptor(&content);
    }

    Err(WardenError::Descriptor(format!(
        "no plugin.toml found in {label}"
    )))
}

/// Plugin ids double as directory names: `[A-Za-z0-9._-]+`, never `.` or `..`.
pub fn is_valid_plugin_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl PluginDescriptor {
    /// Check what a load needs: id, entry point, and a compatible host.
    pub fn validate(&self, host_version: &semver::Version) -> Result<(), WardenError> {
        if self.id.is_empty() {
            return Err(WardenError::Descriptor("plugin id must not be empty".into()));
        }
        if !is_valid_plugin_id(&self.id) {
            return Err(WardenError::Descriptor(format!(
                "plugin id `{}` may only contain letters, digits, '.', '_' and '-'",
                self.id
            )));
        }
        if self.entry_point.is_empty() {
            return Err(WardenError::Descriptor(format!(
                "plugin {}: entry_point must not be empty",
                self.id
            )));
        }
        if let Some(requirement) = &self.host_version {
            let req = semver::VersionReq::parse(requirement).map_err(|e| {
                WardenError::Descriptor(format!(
                    "plugin {}: invalid host_version `{requirement}`: {e}",
                    self.id
                ))
            })?;
            if !req.matches(host_version) {
                return Err(WardenError::Descriptor(format!(
                    "plugin {} requires host {requirement}, running {host_version}",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Library files for this plugin, resolved in `<artifact_dir>/<id>-lib`.
    ///
    /// A missing directory yields no libraries; a named library that is
    /// missing is an error.
    pub fn library_paths(&self, artifact_dir: &Path) -> Result<Vec<PathBuf>, WardenError> {
        let lib_dir = artifact_dir.join(format!("{}-lib", self.id));
        match &self.libraries {
            Libraries::None => Ok(Vec::new()),
            Libraries::All => {
                if !lib_dir.is_dir() {
                    tracing::debug!(plugin_id = %self.id, dir = %lib_dir.display(), "library directory not present");
                    return Ok(Vec::new());
                }
                let mut paths = Vec::new();
                for entry in std::fs::read_dir(&lib_dir)? {
                    let path = entry?.path();
                    if path.is_file() {
                        paths.push(path);
                    }
                }
                paths.sort();
                Ok(paths)
            }
            Libraries::Named(names) => names
                .iter()
                .map(|name| {
                    let path = lib_dir.join(name);
                    if name.contains('/') || name.contains('\\') || !path.is_file() {
                        Err(WardenError::Descriptor(format!(
                            "plugin {}: library `{name}` not found in {}",
                            self.id,
                            lib_dir.display()
                        )))
                    } else {
                        Ok(path)
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> semver::Version {
        semver::Version::new(0, 3, 1)
    }

    #[test]
    fn parses_full_manifest() {
        let d = parse_descriptor(
            r#"
[plugin]
id = "billing"
entry_point = "billing.BillingPlugin"
version = "1.0.0"
description = "Invoices"
host_version = ">=0.3"
libraries = ["pdf.zip"]

[configuration]
currency = "EUR"
"#,
        )
        .unwrap();
        assert_eq!(d.id, "billing");
        assert_eq!(d.entry_point, "billing.BillingPlugin");
        assert_eq!(d.version.as_deref(), Some("1.0.0"));
        assert_eq!(d.libraries, Libraries::Named(vec!["pdf.zip".into()]));
        assert_eq!(d.configuration["currency"], "EUR");
        d.validate(&host()).unwrap();
    }

    #[test]
    fn plugin_class_alias_and_flag() {
        let d = parse_descriptor("[plugin]\nid = \"a\"\nplugin_class = \"a.A\"\nlibraries = true\n")
            .unwrap();
        assert_eq!(d.entry_point, "a.A");
        assert_eq!(d.libraries, Libraries::All);
    }

    #[test]
    fn partial_manifest_parses_but_fails_validation() {
        let d = parse_descriptor("[plugin]\nversion = \"1\"\n").unwrap();
        assert!(d.id.is_empty());
        assert!(matches!(d.validate(&host()), Err(WardenError::Descriptor(_))));

        let d = parse_descriptor("[plugin]\nid = \"a\"\n").unwrap();
        let err = d.validate(&host()).unwrap_err().to_string();
        assert!(err.contains("entry_point"), "got {err}");
    }

    #[test]
    fn rejects_unsafe_ids() {
        for id in ["..", "a/b", "a b", "."] {
            let d = parse_descriptor(&format!("[plugin]\nid = \"{id}\"\nentry_point = \"x\"\n"))
                .unwrap();
            assert!(d.validate(&host()).is_err(), "{id} should be rejected");
        }
    }

    #[test]
    fn host_version_mismatch() {
        let d = parse_descriptor("[plugin]\nid = \"a\"\nentry_point = \"x\"\nhost_version = \"^2\"\n")
            .unwrap();
        let err = d.validate(&host()).unwrap_err().to_string();
        assert!(err.contains("requires host ^2"), "got {err}");
    }

    #[test]
    fn garbage_is_a_descriptor_error() {
        assert!(matches!(
            parse_descriptor("[plugin\nid="),
            Err(WardenError::Descriptor(_))
        ));
    }

    #[test]
    fn library_paths_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("a-lib");
        std::fs::create_dir_all(&lib_dir).unwrap();
        std::fs::write(lib_dir.join("two.zip"), b"").unwrap();
        std::fs::write(lib_dir.join("one.zip"), b"").unwrap();

        let mut d = parse_descriptor("[plugin]\nid = \"a\"\nentry_point = \"x\"\nlibraries = true\n")
            .unwrap();
        let paths = d.library_paths(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["one.zip", "two.zip"]);

        d.libraries = Libraries::Named(vec!["missing.zip".into()]);
        assert!(d.library_paths(dir.path()).is_err());

        d.id = "b".into();
        d.libraries = Libraries::All;
        assert!(d.library_paths(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn descriptor_from_uploaded_bytes() {
        let bytes = warden_test_utils::ArtifactBuilder::new("billing", "billing.Plugin")
            .version("1.4.0")
            .to_bytes();
        let d = read_descriptor_bytes(&bytes).unwrap();
        assert_eq!(d.id, "billing");
        assert_eq!(d.version.as_deref(), Some("1.4.0"));

        let err = read_descriptor_bytes(b"not a zip").unwrap_err().to_string();
        assert!(err.contains("uploaded artifact"), "got {err}");

        let bare = warden_test_utils::ArtifactBuilder::new("x", "y")
            .without_manifest()
            .to_bytes();
        assert!(matches!(read_descriptor_bytes(&bare), Err(WardenError::Descriptor(_))));
    }
}
