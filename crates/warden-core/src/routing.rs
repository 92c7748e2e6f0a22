// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route path helpers: normalization, prefix/class/method combination,
//! template validation and matching.
//!
//! Templates use `{name}` for a single-segment capture and `{*name}` for a
//! trailing catch-all, the same syntax the gateway router accepts.

use std::collections::HashMap;

use crate::error::WardenError;

/// Collapse repeated separators, force a leading `/`, drop a trailing `/`.
///
/// An empty result becomes the root path `/`.
pub fn normalize_path(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

/// Combine an API prefix with class-level and method-level paths.
///
/// Multiple class paths and multiple method paths yield their cartesian
/// product, class-major. An empty list on either side counts as a single
/// empty path. Duplicates are dropped, first occurrence wins.
pub fn combine_paths(prefix: &str, class_paths: &[String], method_paths: &[String]) -> Vec<String> {
    let empty = [String::new()];
    let class_paths = if class_paths.is_empty() {
        &empty[..]
    } else {
        class_paths
    };
    let method_paths = if method_paths.is_empty() {
        &empty[..]
    } else {
        method_paths
    };

    let mut out: Vec<String> = Vec::with_capacity(class_paths.len() * method_paths.len());
    for class_path in class_paths {
        for method_path in method_paths {
            let full = normalize_path(&format!("{prefix}/{class_path}/{method_path}"));
            if !out.contains(&full) {
                out.push(full);
            }
        }
    }
    out
}

/// Reject templates the gateway router could not accept.
pub fn validate_path(path: &str) -> Result<(), WardenError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(WardenError::Route(format!(
                "path `{path}`: segment `{segment}` uses unsupported capture syntax, use `{{name}}`"
            )));
        }
        if !segment.contains('{') && !segment.contains('}') {
            continue;
        }
        let inner = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| {
                WardenError::Route(format!(
                    "path `{path}`: capture `{segment}` must span the whole segment"
                ))
            })?;
        let (name, catch_all) = match inner.strip_prefix('*') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(WardenError::Route(format!(
                "path `{path}`: invalid capture name in `{segment}`"
            )));
        }
        if catch_all && i + 1 != segments.len() {
            return Err(WardenError::Route(format!(
                "path `{path}`: catch-all `{segment}` must be the last segment"
            )));
        }
    }
    Ok(())
}

/// The template with capture names erased, used to detect overlapping routes.
pub fn path_shape(path: &str) -> String {
    let shaped: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}".to_string()
            } else if segment.starts_with('{') {
                "{}".to_string()
            } else {
                segment.to_string()
            }
        })
        .collect();
    format!("/{}", shaped.join("/"))
}

/// Match a concrete request path against a template, returning the captures.
pub fn match_template(template: &str, path: &str) -> Option<HashMap<String, String>> {
    let template_segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut params = HashMap::new();

    for (i, segment) in template_segments.iter().enumerate() {
        if let Some(name) = segment
            .strip_prefix("{*")
            .and_then(|s| s.strip_suffix('}'))
        {
            params.insert(name.to_string(), path_segments.get(i..)?.join("/"));
            return Some(params);
        }
        let actual = path_segments.get(i)?;
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => {
                params.insert(name.to_string(), actual.to_string());
            }
            None if segment == actual => {}
            None => return None,
        }
    }

    (template_segments.len() == path_segments.len()).then_some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_path("//api///plugins/"), "/api/plugins");
        assert_eq!(normalize_path("api"), "/api");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn combine_single_paths() {
        let paths = combine_paths("/api/plugins/billing", &[], &strings(&["/invoices"]));
        assert_eq!(paths, vec!["/api/plugins/billing/invoices"]);
    }

    #[test]
    fn combine_defaults_to_root() {
        assert_eq!(combine_paths("", &[], &[]), vec!["/"]);
        assert_eq!(combine_paths("/", &strings(&["/"]), &strings(&[""])), vec!["/"]);
    }

    #[test]
    fn combine_is_cartesian_class_major() {
        let paths = combine_paths(
            "/p",
            &strings(&["/a", "/b"]),
            &strings(&["x", "/y/"]),
        );
        assert_eq!(paths, vec!["/p/a/x", "/p/a/y", "/p/b/x", "/p/b/y"]);
    }

    #[test]
    fn combine_drops_duplicates() {
        let paths = combine_paths("/p", &strings(&["/a", "a/"]), &strings(&["/x"]));
        assert_eq!(paths, vec!["/p/a/x"]);
    }

    #[test]
    fn validate_accepts_captures() {
        assert!(validate_path("/api/users/{id}").is_ok());
        assert!(validate_path("/files/{*rest}").is_ok());
        assert!(validate_path("/").is_ok());
    }

    #[test]
    fn validate_rejects_bad_templates() {
        assert!(validate_path("/users/:id").is_err());
        assert!(validate_path("/users/*").is_err());
        assert!(validate_path("/users/{id").is_err());
        assert!(validate_path("/users/x{id}").is_err());
        assert!(validate_path("/users/{}").is_err());
        assert!(validate_path("/files/{*rest}/more").is_err());
    }

    #[test]
    fn shape_erases_capture_names() {
        assert_eq!(path_shape("/a/{id}/b/{*rest}"), "/a/{}/b/{*}");
        assert_eq!(path_shape("/a/{x}"), path_shape("/a/{y}"));
    }

    #[test]
    fn match_template_captures_segments() {
        let params = match_template("/users/{id}/roles/{role}", "/users/42/roles/admin").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["role"], "admin");

        let rest = match_template("/files/{*path}", "/files/a/b/c.txt").unwrap();
        assert_eq!(rest["path"], "a/b/c.txt");

        assert!(match_template("/users/{id}", "/users").is_none());
        assert!(match_template("/users/{id}", "/users/1/extra").is_none());
        assert!(match_template("/users/me", "/users/you").is_none());
        assert!(match_template("/", "/").unwrap().is_empty());
    }
}
