pub mod file_matching;

use std::collections::HashSet;
use std::path::Path;

use fs_err as fs;
use url::Url;

use crate::fs::secure_extract_archive;
use crate::git::{CommandExecutor, checkout, clone_minimal, tree_hash};
use crate::package::matching::file_matching::match_trees;
use crate::package::{
    BuildSystemRegenerator, ChangelogGenerator, MatchState, RemoteArchiveMatchResult,
    RemoteArchiveSuggestion, RemoteRepoMatchResult, RemoteRepoSuggestion,
};
use crate::utils::hash256sum_bytes;

fn fill_from_conflicts(
    conflicts: &std::collections::HashMap<String, MatchState>,
) -> (usize, usize, usize, usize) {
    let total = conflicts.len();
    let matched = conflicts.values().filter(|s| **s == MatchState::Matching).count();
    let different = conflicts.values().filter(|s| **s == MatchState::Different).count();
    let no_counterpart = conflicts
        .values()
        .filter(|s| **s == MatchState::NoCounterpart)
        .count();
    (total, matched, different, no_counterpart)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Iterates `suggestions` in descending confidence, downloading and matching each against
/// `local_archive_path` until exhausted. A suggestion whose download fails or whose content
/// duplicates one already seen is recorded but not matched; see §4.4's pre-record-then-fill
/// contract (a diagnostic placeholder survives every early-continue).
pub fn match_archive(
    local_archive_path: &Path,
    mut suggestions: Vec<RemoteArchiveSuggestion>,
    scratch_root: &Path,
) -> Vec<RemoteArchiveMatchResult> {
    suggestions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let mut results = Vec::new();
    let mut seen_urls = HashSet::new();
    let mut seen_hashes = HashSet::new();

    for (index, suggestion) in suggestions.iter().enumerate() {
        if !seen_urls.insert(suggestion.remote_archive.clone()) {
            continue;
        }

        let mut result = RemoteArchiveMatchResult {
            remote_archive_url: suggestion.remote_archive.clone(),
            ..Default::default()
        };

        let Ok(url) = Url::parse(&suggestion.remote_archive) else {
            results.push(result);
            continue;
        };

        let attempt_dir = scratch_root.join(format!("attempt-{index}"));
        let remote_path = attempt_dir.join("remote_archive");
        if crate::http::download_to_file(&url, &remote_path).is_err() {
            results.push(result);
            continue;
        }

        result.accessible = true;

        let Ok(bytes) = fs::read(&remote_path) else {
            results.push(result);
            continue;
        };
        let content_hash = hash256sum_bytes(&bytes);
        if !seen_hashes.insert(content_hash) {
            // Already matched an identical-content candidate earlier -- don't keep the
            // pre-recorded placeholder, it would double-count a content-duplicate archive.
            continue;
        }

        let remote_extracted = attempt_dir.join("remote_extracted");
        if secure_extract_archive(&bytes, &remote_extracted).is_err() {
            results.push(result);
            continue;
        }

        let local_extracted = attempt_dir.join("local_extracted");
        let Ok(local_bytes) = fs::read(local_archive_path) else {
            results.push(result);
            continue;
        };
        if secure_extract_archive(&local_bytes, &local_extracted).is_err() {
            results.push(result);
            continue;
        }

        let match_scratch = attempt_dir.join("match_scratch");
        let conflicts = match_trees(&local_extracted, &remote_extracted, &match_scratch);
        let (total, matched, different, no_counterpart) = fill_from_conflicts(&conflicts);

        result.files_total = total;
        result.files_matched = matched;
        result.files_different = different;
        result.files_no_counterpart = no_counterpart;
        result.matched_ratio = ratio(matched, total);
        result.different_ratio = ratio(different, total);
        result.no_counterpart_ratio = ratio(no_counterpart, total);
        result.matched = total > 0 && matched == total;
        result.conflicts = conflicts;

        results.push(result);
    }

    results
}

/// Extracts `archive_path` once, rebasing onto its single top-level directory if it has one (most
/// upstream archives unpack to `project-version/`), then matches every repo suggestion against it.
pub fn match_repo(
    executor: &impl CommandExecutor,
    archive_path: &Path,
    mut suggestions: Vec<RemoteRepoSuggestion>,
    scratch_root: &Path,
    regenerator: Option<&dyn BuildSystemRegenerator>,
    changelog_generator: Option<&dyn ChangelogGenerator>,
) -> std::io::Result<Vec<RemoteRepoMatchResult>> {
    suggestions.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let archive_root = scratch_root.join("archive_root");
    let bytes = fs::read(archive_path)?;
    secure_extract_archive(&bytes, &archive_root)?;

    let archive_root = rebase_onto_sole_subdir(&archive_root);

    let mut results = Vec::new();
    let mut seen_urls = HashSet::new();
    let mut seen_tree_hashes = HashSet::new();

    for (index, suggestion) in suggestions.iter().enumerate() {
        if !seen_urls.insert(suggestion.repo_url.clone()) {
            continue;
        }

        let mut result = RemoteRepoMatchResult {
            repo_url: suggestion.repo_url.clone(),
            commit_hash: suggestion.commit_hash.clone(),
            tag: suggestion.tag.clone(),
            ..Default::default()
        };

        let repo_dir = scratch_root.join(format!("repo-{index}"));
        if clone_minimal(executor, &suggestion.repo_url, &repo_dir).is_err() {
            results.push(result);
            continue;
        }

        let reference = suggestion
            .tag
            .clone()
            .or_else(|| suggestion.commit_hash.clone());
        let Some(reference) = reference else {
            results.push(result);
            continue;
        };
        if checkout(executor, &repo_dir, &reference).is_err() {
            results.push(result);
            continue;
        }

        result.accessible = true;

        let Ok(Some(hash)) = tree_hash(executor, &repo_dir, "HEAD") else {
            results.push(result);
            continue;
        };
        if !seen_tree_hashes.insert(hash) {
            continue;
        }

        if let Some(regenerator) = regenerator {
            let autotools_cache = scratch_root.join(format!("autotools-cache-{index}"));
            match regenerator.regenerate(&repo_dir, &autotools_cache) {
                Ok(outcome) => {
                    result.build_system_regenerated = true;
                    result.detected_tool_versions = outcome.tool_versions;
                }
                Err(e) => log::warn!("build-system regeneration failed for {}: {e}", suggestion.repo_url),
            }
        }

        if let Some(changelog_generator) = changelog_generator {
            if let Err(e) = changelog_generator.generate(&repo_dir, &archive_root) {
                log::warn!("changelog generation failed for {}: {e}", suggestion.repo_url);
            }
        }

        let match_scratch = scratch_root.join(format!("match-scratch-{index}"));
        let conflicts = match_trees(&archive_root, &repo_dir, &match_scratch);
        let (total, matched, different, no_counterpart) = fill_from_conflicts(&conflicts);

        result.files_total = total;
        result.files_matched = matched;
        result.files_different = different;
        result.files_no_counterpart = no_counterpart;
        result.matched_ratio = ratio(matched, total);
        result.different_ratio = ratio(different, total);
        result.no_counterpart_ratio = ratio(no_counterpart, total);
        result.matched = total > 0 && matched == total;
        result.conflicts = conflicts;

        results.push(result);
    }

    Ok(results)
}

fn rebase_onto_sole_subdir(dir: &Path) -> std::path::PathBuf {
    let Ok(entries) = fs::read_dir(dir) else {
        return dir.to_path_buf();
    };
    let entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    if entries.len() == 1 && entries[0].path().is_dir() {
        entries[0].path()
    } else {
        dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_archive_records_unreachable_suggestion_as_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("local.tar.gz");
        fs::write(&local, b"not really an archive").unwrap();

        let suggestions = vec![RemoteArchiveSuggestion {
            remote_archive: "https://example.invalid/definitely-missing.tar.gz".to_string(),
            originating_spec_source: None,
            method_name: "known_urls".to_string(),
            notes: None,
            confidence: 1.0,
        }];

        let results = match_archive(&local, suggestions, tmp.path());
        assert_eq!(results.len(), 1);
        assert!(!results[0].accessible);
        assert!(!results[0].matched);
    }

    #[test]
    fn rebase_onto_sole_subdir_descends_one_level() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("extracted");
        let inner = root.join("project-1.0");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("file.txt"), "x").unwrap();

        let rebased = rebase_onto_sole_subdir(&root);
        assert_eq!(rebased, inner);
    }
}
