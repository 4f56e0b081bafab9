//! Typed view over the `suggestions_*.json`/`transformations_*.json` configuration trees, which
//! arrive as loosely-typed JSON (see [`crate::config`]).

use std::collections::BTreeMap;

use serde_json::Value;

fn string_array(map: &BTreeMap<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn string_pairs(map: &BTreeMap<String, Value>, key: &str) -> Vec<(String, String)> {
    map.get(key)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionConfig {
    /// Known archive-hosting directory prefixes tried with the local basename appended.
    pub known_urls: Vec<String>,
    /// `from -> to` path substitutions tried by the "moved and recompressed" method.
    pub moved_replacements: Vec<(String, String)>,
    /// Alternative first-label substitutions for the "subdomain substitution" method.
    pub subdomains: Vec<String>,
    /// Regexes identifying a declared source as "this is a bundle of other archives".
    pub clues_regex: Vec<String>,
    pub clues_required: usize,
}

impl SuggestionConfig {
    pub fn from_map(map: &BTreeMap<String, Value>) -> Self {
        let clues_required = map
            .get("clues_required")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;

        Self {
            known_urls: string_array(map, "known_urls"),
            moved_replacements: string_pairs(map, "moved_replacements"),
            subdomains: string_array(map, "subdomains"),
            clues_regex: string_array(map, "clues_regex"),
            clues_required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_known_urls_and_pairs() {
        let mut map = BTreeMap::new();
        map.insert(
            "known_urls".to_string(),
            serde_json::json!(["https://a.example/", "https://b.example/"]),
        );
        map.insert(
            "moved_replacements".to_string(),
            serde_json::json!({"old/path": "new/path"}),
        );

        let config = SuggestionConfig::from_map(&map);
        assert_eq!(config.known_urls.len(), 2);
        assert_eq!(config.moved_replacements, vec![("old/path".to_string(), "new/path".to_string())]);
    }
}
