// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Unknown keys are located in the TOML text they came from, so the rendered
//! report points at the offending line and offers the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler similarity a key must exceed to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, ready for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(warden::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted table path, empty for the document root.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(warden::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(warden::config::missing_key),
        help("add `{key} = <value>` to warden.toml")
    )]
    MissingKey { key: String },

    /// Raised by semantic validation after deserialization succeeded.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(warden::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(warden::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(key) => format!("did you mean `{key}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

fn dotted(path: &[String]) -> String {
    path.join(".")
}

/// Split a figment error (possibly holding several) into diagnostics.
///
/// `sources` pairs a display name with the TOML text it was read from.
pub fn figment_to_config_errors(
    err: FigmentError,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, field, sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section: dotted(&error.path),
                    suggestion: suggest_key(field, *expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let mut path = error.path.clone();
                path.push(field.to_string());
                ConfigError::MissingKey { key: dotted(&path) }
            }
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: dotted(&error.path),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Source text an error came from. Inline strings carry no file metadata,
/// so a single known source is assumed to be it.
fn source_of<'a>(
    error: &FigmentError,
    sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match file {
        Some(file) => sources.iter().find(|(name, _)| *name == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    }
}

fn locate(
    error: &FigmentError,
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((name, content)) = source_of(error, sources) else {
        return (None, None);
    };
    match find_key_offset(content, &error.path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the table named by `path`.
///
/// Table headers are tracked line by line, so `[plugins.overrides.billing]`
/// is matched by the full dotted path rather than its first segment.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted = dotted(path);
    let mut table = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let text = line.trim();
        if let Some(header) = text.strip_prefix('[').and_then(|h| h.split(']').next()) {
            table = header.trim().to_string();
        } else if table == wanted
            && text
                .strip_prefix(field)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The valid key most similar to `unknown`, if any is similar enough.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, valid_keys: &[S]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (key.as_ref(), strsim::jaro_winkler(unknown, key.as_ref())))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_directory_for_typo() {
        let valid = ["directory", "data_directory", "auto_load"];
        assert_eq!(suggest_key("directroy", &valid), Some("directory".to_string()));
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = ["host", "port", "admin_token"];
        assert_eq!(suggest_key("zzzzzz", &valid), None);
    }

    #[test]
    fn key_offset_is_scoped_to_its_table() {
        let content = "[logging]\nprot = 1\n[server]\nprot = 80\n";
        let path = vec!["server".to_string()];
        let offset = find_key_offset(content, &path, "prot").unwrap();
        assert_eq!(offset, content.rfind("prot").unwrap());
    }

    #[test]
    fn key_offset_handles_crlf_and_indentation() {
        let content = "[plugins]\r\n  auto_lod = true\r\n";
        let path = vec!["plugins".to_string()];
        let offset = find_key_offset(content, &path, "auto_lod").unwrap();
        assert_eq!(&content[offset..offset + 8], "auto_lod");
    }

    #[test]
    fn key_offset_matches_nested_tables() {
        let content = "[plugins]\ndirectory = \"p\"\n[plugins.overrides.billing]\ncurrency = \"EUR\"\n";
        let path: Vec<String> = ["plugins", "overrides", "billing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let offset = find_key_offset(content, &path, "currency").unwrap();
        assert_eq!(&content[offset..offset + 8], "currency");
        assert!(find_key_offset(content, &path[..1], "currency").is_none());
    }

    #[test]
    fn key_prefix_is_not_a_match() {
        let content = "[plugins]\ndirectory_x = 1\n";
        let path = vec!["plugins".to_string()];
        assert!(find_key_offset(content, &path, "directory").is_none());
    }

    #[test]
    fn unknown_key_message_names_the_table() {
        let err = ConfigError::UnknownKey {
            key: "prot".into(),
            section: "server".into(),
            suggestion: Some("port".into()),
            valid_keys: "host, port".into(),
            span: None,
            src: None,
        };
        assert_eq!(err.to_string(), "unknown key `prot` in [server]");
    }
}
