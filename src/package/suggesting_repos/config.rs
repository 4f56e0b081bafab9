//! Typed view over the repo-suggestion slice of configuration, mirroring
//! [`crate::package::suggesting_archives::config::SuggestionConfig`].

use std::collections::BTreeMap;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RepoSuggestionConfig {
    /// `(platform name, URL template with a `{p}` project-name placeholder)` pairs tried by the
    /// known-hostings method, in addition to the built-in [`crate::consts::KNOWN_HOSTING_TEMPLATES`].
    pub extra_hosting_templates: Vec<(String, String)>,
    /// Base URL of a package-metadata site whose `{p}` page lists upstream repository links.
    pub metadata_site_base_url: Option<String>,
    /// Base URL of the code-search API (defaults to GitHub's when absent).
    pub code_search_api_base_url: Option<String>,
}

impl Default for RepoSuggestionConfig {
    fn default() -> Self {
        Self {
            extra_hosting_templates: Vec::new(),
            metadata_site_base_url: None,
            code_search_api_base_url: Some("https://api.github.com/search/repositories".to_string()),
        }
    }
}

impl RepoSuggestionConfig {
    pub fn from_map(map: &BTreeMap<String, Value>) -> Self {
        let extra_hosting_templates = map
            .get("extra_hosting_templates")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let metadata_site_base_url = map
            .get("metadata_site_base_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        let code_search_api_base_url = map
            .get("code_search_api_base_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some("https://api.github.com/search/repositories".to_string()));

        Self {
            extra_hosting_templates,
            metadata_site_base_url,
            code_search_api_base_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_github_code_search() {
        let config = RepoSuggestionConfig::default();
        assert_eq!(
            config.code_search_api_base_url.as_deref(),
            Some("https://api.github.com/search/repositories")
        );
    }

    #[test]
    fn reads_extra_hosting_templates() {
        let mut map = BTreeMap::new();
        map.insert(
            "extra_hosting_templates".to_string(),
            serde_json::json!({"Codeberg": "https://codeberg.org/{p}/{p}"}),
        );
        let config = RepoSuggestionConfig::from_map(&map);
        assert_eq!(
            config.extra_hosting_templates,
            vec![("Codeberg".to_string(), "https://codeberg.org/{p}/{p}".to_string())]
        );
    }
}
