//! Canonical paths and reference URL resolution.

use regex::Regex;
use std::sync::OnceLock;

fn page_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:.+/)?pages/([0-9]+)\.json$").expect("page path regex must compile")
    })
}

pub fn catalog_path(workspace: &str) -> String {
    format!("{workspace}/catalog.json")
}

/// First path segment of a canonical path.
pub fn workspace_of(path: &str) -> &str {
    path.split('/').next().unwrap_or("")
}

/// Page number encoded in a `.../pages/{n}.json` path.
pub fn page_number(path: &str) -> Option<u64> {
    page_path_re()
        .captures(path)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolve a reference URL to a canonical path.
///
/// A leading `/` is stripped, then `url_prefix` if present. URLs carrying a
/// scheme, query, fragment, or dot segments cannot name a stored document.
pub fn resolve_url(raw: &str, url_prefix: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.contains("://")
        || trimmed.contains('?')
        || trimmed.contains('#')
        || trimmed.contains('\\')
    {
        return None;
    }

    let mut path = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let prefix = url_prefix.trim_matches('/');
    if !prefix.is_empty()
        && let Some(rest) = path.strip_prefix(prefix)
        && let Some(rest) = rest.strip_prefix('/')
    {
        path = rest;
    }

    if path
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return None;
    }
    Some(path.to_string())
}
