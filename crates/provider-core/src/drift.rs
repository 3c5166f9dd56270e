//! Helpers for comparing declared attributes against observed metadata
//!
//! Observed option values live in nested provider-specific metadata
//! documents. Reads resolve each declared option against that document
//! and copy the observed value into declared state; the database is
//! always the source of truth.

use serde_json::Value;

/// Look up a value in a metadata document by dot-separated path.
///
/// Returns `None` when any segment of the path is absent.
pub fn metadata_path<'a>(metadata: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = metadata;
    for part in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(part)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Resolve a boolean feature flag nested inside object metadata.
///
/// Absent or non-boolean values read as `false`: an option the server
/// never reported is an option that is off.
pub fn nested_flag(metadata: &Value, path: &str) -> bool {
    metadata_path(metadata, path)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
