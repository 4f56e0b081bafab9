pub mod config;
pub mod methods;
pub mod transformations;

use std::collections::{HashMap, HashSet};

use crate::package::suggesting_archives::config::SuggestionConfig;
use crate::package::{
    LocalArchiveTransformation, PackageRemoteArchivesSuggestions, RemoteArchiveSuggestion,
};

/// Runs Phase A (transformations) then Phase B (suggestion methods per local archive), and
/// assembles the final suggestions document. `timestamp` is supplied by the caller since this
/// module must stay free of wall-clock reads to remain cache-reproducible.
pub fn suggest_package_archives(
    source_package_name: &str,
    local_archives: Vec<String>,
    declared_sources: Vec<String>,
    archive_dir: &std::path::Path,
    config: &SuggestionConfig,
    timestamp: String,
) -> PackageRemoteArchivesSuggestions {
    let orig_local_archives = local_archives.clone();
    let orig_spec_sources = declared_sources.clone();

    let (trans_local_archives, trans_spec_sources, transformations) =
        transformations::apply_transformations(local_archives, declared_sources, archive_dir, config);

    let mut suggestions: HashMap<String, Vec<RemoteArchiveSuggestion>> = HashMap::new();
    let mut used_sources: HashSet<String> = HashSet::new();

    for local_basename in &trans_local_archives {
        let found = methods::suggest_remote_archives(local_basename, &trans_spec_sources, config);
        for s in &found {
            if let Some(origin) = &s.originating_spec_source {
                used_sources.insert(origin.clone());
            }
        }
        suggestions.insert(local_basename.clone(), found);
    }

    let unused_spec_sources = trans_spec_sources
        .iter()
        .filter(|s| !used_sources.contains(*s))
        .cloned()
        .collect();

    PackageRemoteArchivesSuggestions {
        source_package_name: source_package_name.to_string(),
        orig_local_archives,
        orig_spec_sources,
        trans_local_archives,
        trans_spec_sources,
        transformations: transformations_or_empty(transformations),
        suggestions,
        unused_spec_sources,
        timestamp,
    }
}

fn transformations_or_empty(t: Vec<LocalArchiveTransformation>) -> Vec<LocalArchiveTransformation> {
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_sources_exclude_every_suggestion_origin() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/acl-2.3.1.tar.gz").with_status(200).create();
        let url = format!("{}/acl-2.3.1.tar.gz", server.url());

        let tmp = tempfile::tempdir().unwrap();
        let config = SuggestionConfig::default();

        let result = suggest_package_archives(
            "acl",
            vec!["acl-2.3.1.tar.gz".to_string()],
            vec![url.clone(), "https://unrelated.invalid/other.tar.gz".to_string()],
            tmp.path(),
            &config,
            "2026-01-01T00:00:00Z".to_string(),
        );

        assert!(!result.unused_spec_sources.contains(&url));
        assert!(result.unused_spec_sources.contains(&"https://unrelated.invalid/other.tar.gz".to_string()));
    }
}
