//! Layered configuration: deep-merged JSON rule files under `configuration/`.
//!
//! Suggestion heuristics and archive/spec-source transformations are data, not code -- they live
//! in `configuration/{suggestions,transformations}_*.json` under `ENVROOT` (or the current
//! directory), and every matching file is merged into one tree before use. This lets a deployment
//! add site-specific hints (an internal mirror, a vendored fork naming convention) without
//! touching the binary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use fs_err as fs;
use serde_json::Value;

use crate::consts::{CONFIGURATION_DIR_NAME, ENVROOT_ENV_VAR_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("conflicting scalar values for configuration key `{0}`")]
    Conflict(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn configuration_dir() -> PathBuf {
    let root = std::env::var(ENVROOT_ENV_VAR_NAME).unwrap_or_else(|_| ".".to_string());
    PathBuf::from(root).join(CONFIGURATION_DIR_NAME)
}

/// Merges `b` into `a` in place: nested objects merge recursively, arrays concatenate, and
/// differing scalars are a hard conflict. Keys beginning with `_` are skipped, mirroring the
/// convention used elsewhere in this crate to mark bookkeeping fields.
fn merge(a: &mut Value, b: Value, path: &mut Vec<String>) -> Result<(), ConfigError> {
    let (Value::Object(a_map), Value::Object(b_map)) = (a, b) else {
        return Ok(());
    };

    for (key, b_value) in b_map {
        if key.starts_with('_') {
            continue;
        }
        path.push(key.clone());
        match a_map.get_mut(&key) {
            Some(a_value) => match (a_value, b_value) {
                (Value::Object(_), Value::Object(_)) => {
                    merge(a_map.get_mut(&key).unwrap(), b_value, path)?;
                }
                (Value::Array(a_arr), Value::Array(b_arr)) => {
                    a_arr.extend(b_arr);
                }
                (existing, incoming) => {
                    if *existing != incoming {
                        return Err(ConfigError::Conflict(path.join(".")));
                    }
                }
            },
            None => {
                a_map.insert(key.clone(), b_value);
            }
        }
        path.pop();
    }
    Ok(())
}

/// Loads and deep-merges every file under `configuration/` matching `glob_pattern`, in
/// directory-listing order (callers needing determinism should make filenames sort the way they
/// want merged).
fn load_config(glob_pattern: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
    let dir = configuration_dir();
    let mut merged = Value::Object(serde_json::Map::new());

    let pattern = dir.join(glob_pattern);
    let pattern_str = pattern.to_string_lossy().into_owned();

    if let Ok(paths) = glob::glob(&pattern_str) {
        for entry in paths.flatten() {
            let content = fs::read_to_string(&entry)?;
            let parsed: Value = serde_json::from_str(&content)?;
            merge(&mut merged, parsed, &mut Vec::new())?;
        }
    }

    match merged {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Ok(BTreeMap::new()),
    }
}

pub fn get_transformations_config() -> Result<BTreeMap<String, Value>, ConfigError> {
    load_config("transformations_*.json")
}

pub fn get_suggestions_config() -> Result<BTreeMap<String, Value>, ConfigError> {
    load_config("suggestions_*.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_nested_objects_and_concatenates_arrays() {
        let mut a = serde_json::json!({"hostings": ["github"], "rules": {"x": 1}});
        let b = serde_json::json!({"hostings": ["gitlab"], "rules": {"y": 2}, "_comment": "skip me"});

        merge(&mut a, b, &mut Vec::new()).unwrap();

        assert_eq!(a["hostings"], serde_json::json!(["github", "gitlab"]));
        assert_eq!(a["rules"], serde_json::json!({"x": 1, "y": 2}));
        assert!(a.get("_comment").is_none());
    }

    #[test]
    fn conflicting_scalars_error() {
        let mut a = serde_json::json!({"timeout": 3});
        let b = serde_json::json!({"timeout": 5});

        let err = merge(&mut a, b, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Conflict(k) if k == "timeout"));
    }
}
