// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `warden plugins ...`: read artifacts without loading any plugin code.

use std::path::{Path, PathBuf};

use warden_config::WardenConfig;
use warden_core::WardenError;
use warden_plugin::{HOST_VERSION, Libraries, PluginDescriptor, read_descriptor, scan_artifacts};

/// Outcome of reading one artifact's descriptor.
#[derive(Debug)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub descriptor: Result<PluginDescriptor, WardenError>,
}

fn host_version() -> Result<semver::Version, WardenError> {
    semver::Version::parse(HOST_VERSION)
        .map_err(|e| WardenError::Internal(format!("invalid host version {HOST_VERSION}: {e}")))
}

/// Read and validate the descriptor of the artifact at `path`.
pub fn inspect(path: &Path) -> Result<PluginDescriptor, WardenError> {
    let descriptor = read_descriptor(path)?;
    descriptor.validate(&host_version()?)?;
    Ok(descriptor)
}

/// Inspect every artifact in `dir`.
pub fn scan(dir: &Path, extension: &str) -> Result<Vec<ArtifactReport>, WardenError> {
    Ok(scan_artifacts(dir, extension)?
        .into_iter()
        .map(|path| {
            let descriptor = inspect(&path);
            ArtifactReport { path, descriptor }
        })
        .collect())
}

fn libraries_label(libraries: &Libraries) -> String {
    match libraries {
        Libraries::None => "none".to_string(),
        Libraries::All => "all".to_string(),
        Libraries::Named(names) => names.join(", "),
    }
}

/// Multi-line human description of a descriptor.
pub fn describe(descriptor: &PluginDescriptor) -> String {
    let mut lines = vec![
        format!("id:           {}", descriptor.id),
        format!("entry point:  {}", descriptor.entry_point),
        format!(
            "version:      {}",
            descriptor.version.as_deref().unwrap_or("-")
        ),
    ];
    if let Some(description) = &descriptor.description {
        lines.push(format!("description:  {description}"));
    }
    if let Some(requirement) = &descriptor.host_version {
        lines.push(format!("host version: {requirement}"));
    }
    lines.push(format!(
        "libraries:    {}",
        libraries_label(&descriptor.libraries)
    ));
    if !descriptor.configuration.is_empty() {
        let mut keys: Vec<&str> = descriptor.configuration.keys().map(String::as_str).collect();
        keys.sort_unstable();
        lines.push(format!("config keys:  {}", keys.join(", ")));
    }
    lines.join("\n")
}

/// One table row per artifact.
pub fn render_table(reports: &[ArtifactReport]) -> String {
    if reports.is_empty() {
        return "no plugin artifacts found".to_string();
    }
    let mut out = format!("{:<24} {:<12} {:<32} {}\n", "ID", "VERSION", "ENTRY POINT", "ARTIFACT");
    for report in reports {
        let file = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &report.descriptor {
            Ok(d) => out.push_str(&format!(
                "{:<24} {:<12} {:<32} {}\n",
                d.id,
                d.version.as_deref().unwrap_or("-"),
                d.entry_point,
                file
            )),
            Err(e) => out.push_str(&format!("{:<24} {:<12} {:<32} {} ({e})\n", "?", "-", "-", file)),
        }
    }
    out
}

/// JSON array of reports; invalid artifacts carry an `error` field.
pub fn render_json(reports: &[ArtifactReport]) -> serde_json::Value {
    serde_json::Value::Array(
        reports
            .iter()
            .map(|report| {
                let path = report.path.display().to_string();
                match &report.descriptor {
                    Ok(d) => serde_json::json!({ "path": path, "descriptor": d }),
                    Err(e) => serde_json::json!({ "path": path, "error": e.to_string() }),
                }
            })
            .collect(),
    )
}

pub fn run_list(config: &WardenConfig, json: bool) -> Result<(), WardenError> {
    let reports = scan(
        Path::new(&config.plugins.directory),
        &config.plugins.artifact_extension,
    )?;
    if json {
        let rendered = serde_json::to_string_pretty(&render_json(&reports))
            .map_err(|e| WardenError::Internal(format!("cannot render JSON: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render_table(&reports));
    }
    Ok(())
}

pub fn run_inspect(artifact: &Path) -> Result<(), WardenError> {
    let descriptor = inspect(artifact)?;
    println!("{}", describe(&descriptor));
    Ok(())
}
