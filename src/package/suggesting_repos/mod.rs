pub mod config;
pub mod suggestion_methods;
pub mod version_utils;

use std::collections::HashMap;
use std::path::Path;

use fs_err as fs;

use crate::git::{CommandExecutor, clone_minimal, is_release_tag, list_tags, tree_hash, verify_commit_exists};
use crate::package::suggesting_repos::config::RepoSuggestionConfig;
use crate::package::suggesting_repos::version_utils::{TagInfo, extract_version_from_archive_name, verify_tag_exists};
use crate::package::{PackageRemoteReposSuggestions, RemoteRepoSuggestion};
use crate::utils::remove_archive_suffix;

/// Resolves Phase B for one candidate: clones it minimally and attaches a `commit_hash`/`tag` if
/// the archive's version can be matched against the repo's history. A candidate that fails to
/// clone, or whose version can't be matched to anything, is dropped rather than surfaced
/// half-resolved -- a suggestion without a resolved ref is not actionable by the matcher.
pub fn resolve_candidate(
    executor: &impl CommandExecutor,
    candidate: RemoteRepoSuggestion,
    archive_basename: &str,
    clone_dir: &Path,
) -> Option<RemoteRepoSuggestion> {
    if clone_minimal(executor, &candidate.repo_url, clone_dir).is_err() {
        return None;
    }

    let stem = remove_archive_suffix(archive_basename);
    let info = extract_version_from_archive_name(archive_basename);

    if info.is_commit_hash {
        let commit = info.version.clone()?;
        if verify_commit_exists(executor, clone_dir, &commit) {
            return Some(RemoteRepoSuggestion {
                commit_hash: Some(commit),
                ..candidate
            });
        }
        return None;
    }

    let tags = list_tags(executor, clone_dir).ok()?;
    let release_tags: Vec<TagInfo> = tags
        .into_iter()
        .filter(|t| is_release_tag(t))
        .map(|t| TagInfo {
            commit_hash: String::new(),
            tag: t,
        })
        .collect();

    let best = verify_tag_exists(&info, &release_tags, &stem)?;
    let resolved_hash = tree_hash(executor, clone_dir, &best.tag).ok().flatten();

    Some(RemoteRepoSuggestion {
        commit_hash: resolved_hash,
        tag: Some(best.tag),
        ..candidate
    })
}

/// Runs Phase A (candidate enumeration) then Phase B (version resolution) for every local archive,
/// and assembles the final suggestions document. Each candidate is cloned into its own scratch
/// subdirectory of `work_dir`, which the caller is responsible for cleaning up.
pub fn suggest_package_repos(
    executor: &impl CommandExecutor,
    source_package_name: &str,
    local_archives: &[String],
    declared_sources: &[String],
    config: &RepoSuggestionConfig,
    work_dir: &Path,
    timestamp: String,
) -> PackageRemoteReposSuggestions {
    let mut suggestions: HashMap<String, Vec<RemoteRepoSuggestion>> = HashMap::new();

    for (index, archive_basename) in local_archives.iter().enumerate() {
        let stem = remove_archive_suffix(archive_basename);
        let candidates = suggestion_methods::suggest_remote_repos(
            &stem,
            source_package_name,
            declared_sources,
            config,
        );

        let mut resolved = Vec::new();
        for (candidate_index, candidate) in candidates.into_iter().enumerate() {
            let clone_dir = work_dir.join(format!("{index}-{candidate_index}"));
            if let Some(suggestion) = resolve_candidate(executor, candidate, archive_basename, &clone_dir) {
                resolved.push(suggestion);
            }
            let _ = fs::remove_dir_all(&clone_dir);
        }

        suggestions.insert(archive_basename.clone(), resolved);
    }

    PackageRemoteReposSuggestions {
        source_package_name: source_package_name.to_string(),
        suggestions,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::process::Command;

    struct ScriptedExecutor {
        responses: RefCell<Vec<Result<String, String>>>,
    }

    impl CommandExecutor for ScriptedExecutor {
        fn execute(&self, _command: &mut Command) -> Result<String, std::io::Error> {
            match self.responses.borrow_mut().remove(0) {
                Ok(out) => Ok(out),
                Err(e) => Err(std::io::Error::other(e)),
            }
        }
    }

    #[test]
    fn resolve_candidate_attaches_matching_tag() {
        let executor = ScriptedExecutor {
            responses: RefCell::new(vec![
                Ok(String::new()),                 // clone_minimal
                Ok("v2.3.1\nv2.3.10".to_string()), // list_tags
                Ok("deadbeef".to_string()),         // tree_hash
            ]),
        };

        let candidate = RemoteRepoSuggestion {
            repo_url: "https://example.invalid/acl.git".to_string(),
            originating_spec_source: None,
            method_name: "known_hostings".to_string(),
            notes: None,
            confidence: 0.6,
            commit_hash: None,
            tag: None,
        };

        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_candidate(&executor, candidate, "acl-2.3.1.tar.gz", tmp.path()).unwrap();
        assert_eq!(resolved.tag.as_deref(), Some("v2.3.1"));
        assert_eq!(resolved.commit_hash.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn resolve_candidate_drops_suggestion_when_clone_fails() {
        let executor = ScriptedExecutor {
            responses: RefCell::new(vec![Err("no such repository".to_string())]),
        };

        let candidate = RemoteRepoSuggestion {
            repo_url: "https://example.invalid/missing.git".to_string(),
            originating_spec_source: None,
            method_name: "known_hostings".to_string(),
            notes: None,
            confidence: 0.6,
            commit_hash: None,
            tag: None,
        };

        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_candidate(&executor, candidate, "acl-2.3.1.tar.gz", tmp.path());
        assert!(resolved.is_none());
    }
}
