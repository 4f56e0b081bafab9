//! Phase A of the archive-suggestion engine: rewrites applied to `(local_archives,
//! declared_sources)` before Phase B's suggestion methods run.

use fs_err as fs;
use regex::Regex;
use url::Url;

use crate::fs::secure_extract_archive;
use crate::package::LocalArchiveTransformation;
use crate::package::suggesting_archives::config::SuggestionConfig;

/// *Extract nested archives*: when the source package bundles one archive that is itself a
/// collection of other archives (a "superpackage"), unwrap it so the inner archives can each be
/// suggested against individually.
pub fn extract_nested_archives(
    local_archives: &[String],
    declared_sources: &[String],
    archive_dir: &std::path::Path,
    config: &SuggestionConfig,
) -> Option<LocalArchiveTransformation> {
    if local_archives.len() != 1 || declared_sources.len() != 1 {
        return None;
    }
    let declared = &declared_sources[0];
    if Url::parse(declared).is_ok() {
        return None;
    }

    let clues_found = config
        .clues_regex
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .filter(|re| re.is_match(declared))
        .count();
    if config.clues_required == 0 || clues_found == 0 {
        return None;
    }

    let archive_path = archive_dir.join(&local_archives[0]);
    let bytes = fs::read(&archive_path).ok()?;

    let staging = archive_dir.join(format!("{}.unwrapped", local_archives[0]));
    secure_extract_archive(&bytes, &staging).ok()?;

    let members = crate::fs::list_files_recursive(&staging).ok()?;
    if members.is_empty() {
        return None;
    }
    let all_archives = members.iter().all(|m| {
        m.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| crate::consts::SUPPORTED_ARCHIVE_TYPES.iter().any(|s| n.ends_with(s)))
    });
    if !all_archives {
        return None;
    }

    let renamed = archive_dir.join(format!("{}.original", local_archives[0]));
    if fs::rename(&archive_path, &renamed).is_err() {
        return None;
    }

    let member_names: Vec<String> = members
        .iter()
        .filter_map(|m| m.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let confidence = (clues_found as f64 / config.clues_required as f64).min(1.0);

    Some(LocalArchiveTransformation {
        name: "extract_nested_archives".to_string(),
        input_local_archives: local_archives.to_vec(),
        input_spec_sources: declared_sources.to_vec(),
        output_local_archives: member_names.clone(),
        output_spec_sources: member_names,
        notes: Some(format!("unwrapped bundle archive {}", local_archives[0])),
        confidence,
    })
}

/// *Strip URL fragments*: drop the `#...` portion of any `http(s)` declared source.
pub fn strip_url_fragments(
    local_archives: &[String],
    declared_sources: &[String],
) -> Option<LocalArchiveTransformation> {
    let mut changed = false;
    let stripped: Vec<String> = declared_sources
        .iter()
        .map(|source| {
            if let Ok(mut url) = Url::parse(source) {
                if (url.scheme() == "http" || url.scheme() == "https") && url.fragment().is_some() {
                    url.set_fragment(None);
                    changed = true;
                    return url.to_string();
                }
            }
            source.clone()
        })
        .collect();

    if !changed {
        return None;
    }

    Some(LocalArchiveTransformation {
        name: "strip_url_fragments".to_string(),
        input_local_archives: local_archives.to_vec(),
        input_spec_sources: declared_sources.to_vec(),
        output_local_archives: local_archives.to_vec(),
        output_spec_sources: stripped,
        notes: Some("stripped URL fragment".to_string()),
        confidence: 1.0,
    })
}

/// Runs every transformation in the fixed order, threading the mutated tuple through. Returns the
/// final `(local_archives, declared_sources)` alongside the ordered list of applied records.
pub fn apply_transformations(
    local_archives: Vec<String>,
    declared_sources: Vec<String>,
    archive_dir: &std::path::Path,
    config: &SuggestionConfig,
) -> (Vec<String>, Vec<String>, Vec<LocalArchiveTransformation>) {
    let mut archives = local_archives;
    let mut sources = declared_sources;
    let mut records = Vec::new();

    if let Some(record) = extract_nested_archives(&archives, &sources, archive_dir, config) {
        archives = record.output_local_archives.clone();
        sources = record.output_spec_sources.clone();
        records.push(record);
    }

    if let Some(record) = strip_url_fragments(&archives, &sources) {
        sources = record.output_spec_sources.clone();
        records.push(record);
    }

    (archives, sources, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_from_http_source() {
        let archives = vec!["foo-1.0.tar.gz".to_string()];
        let sources = vec!["https://example.com/foo-1.0.tar.gz#readme".to_string()];

        let record = strip_url_fragments(&archives, &sources).unwrap();
        assert_eq!(record.output_spec_sources[0], "https://example.com/foo-1.0.tar.gz");
    }

    #[test]
    fn no_transformation_when_no_fragment() {
        let archives = vec!["foo-1.0.tar.gz".to_string()];
        let sources = vec!["https://example.com/foo-1.0.tar.gz".to_string()];
        assert!(strip_url_fragments(&archives, &sources).is_none());
    }
}
