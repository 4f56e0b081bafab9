//! Package- and fleet-level validation: wires the suggestion engines and matchers together into
//! the top-level per-package and whole-system entry points.

use std::collections::HashMap;
use std::path::Path;

use crate::cache::OperationCache;
use crate::git::CommandExecutor;
use crate::package::matching::{match_archive, match_repo};
use crate::package::rpm::RpmSourcePackage;
use crate::package::suggesting_archives::config::SuggestionConfig as ArchiveSuggestionConfig;
use crate::package::suggesting_repos::config::RepoSuggestionConfig;
use crate::package::{
    BuildSystemRegenerator, ChangelogGenerator, InstallationDecision, PackageArchiveMatchesResult,
    PackageRepoMatchesResult, PackageValidationResult, RemoteArchiveMatchResult, RemoteRepoMatchResult,
    SourcePackageProvider, SystemValidationResult,
};
use crate::package::{suggesting_archives, suggesting_repos};

/// Narrow contract over however the host exposes "every installed package with its own source
/// package" -- on an RPM system, this is `rpm -qa --qf %{SOURCERPM}` deduplicated.
pub trait PackageEnumerator {
    fn enumerate(&self) -> Vec<String>;
}

pub struct PackageValidator<'a, P: SourcePackageProvider> {
    pub provider_factory: &'a dyn Fn() -> P,
    pub executor: &'a dyn CommandExecutor,
    pub archive_config: &'a ArchiveSuggestionConfig,
    pub repo_config: &'a RepoSuggestionConfig,
    pub cache: &'a OperationCache,
    pub regenerator: Option<&'a dyn BuildSystemRegenerator>,
    pub changelog_generator: Option<&'a dyn ChangelogGenerator>,
    pub scratch_root: &'a Path,
    pub timestamp: &'a str,
    /// Overrides the provider's own source-archive lookup with an already-downloaded SRPM file,
    /// e.g. the CLI's `--srpm-file` flag.
    pub local_archive_override: Option<&'a Path>,
    pub build_deps: InstallationDecision,
}

impl<'a, P: SourcePackageProvider> PackageValidator<'a, P> {
    /// Runs the archive-suggester, then the repo-suggester, then both matchers, and picks the
    /// highest-confidence matched upstream for each local archive.
    pub fn validate(&self, package_name: &str) -> PackageValidationResult {
        let package_scratch = self.scratch_root.join(package_name);

        let mut source_package = RpmSourcePackage::new(
            package_name,
            self.local_archive_override.map(Path::to_path_buf),
            self.build_deps,
            (self.provider_factory)(),
            package_scratch.join("srpm"),
        );
        source_package.initialize();

        let (local_archives, declared_sources) = source_package.local_and_declared_archives();
        let repository_urls = source_package.repository_urls();

        let local_basenames: Vec<String> = local_archives.iter().map(|a| a.basename.clone()).collect();
        let archive_hashes: HashMap<String, String> = local_archives
            .iter()
            .map(|a| (a.basename.clone(), a.sha256.clone()))
            .collect();

        let archive_suggestions = self.cache.call(
            "suggest_package_archives",
            &[],
            || {
                suggesting_archives::suggest_package_archives(
                    package_name,
                    local_basenames.clone(),
                    declared_sources.clone(),
                    source_package.scratch_dir(),
                    self.archive_config,
                    self.timestamp.to_string(),
                )
            },
        );

        let repo_work_dir = package_scratch.join("repo-suggestions");
        let repo_suggestions = suggesting_repos::suggest_package_repos(
            self.executor,
            package_name,
            &local_basenames,
            &repository_urls,
            self.repo_config,
            &repo_work_dir,
            self.timestamp.to_string(),
        );

        let mut archive_match_results: HashMap<String, Vec<RemoteArchiveMatchResult>> = HashMap::new();
        for basename in &local_basenames {
            let Some(local_archive) = local_archives.iter().find(|a| &a.basename == basename) else {
                continue;
            };
            let candidates = archive_suggestions
                .suggestions
                .get(basename)
                .cloned()
                .unwrap_or_default();
            let matches = match_archive(
                &local_archive.path,
                candidates,
                &package_scratch.join(format!("archive-match-{basename}")),
            );
            archive_match_results.insert(basename.clone(), matches);
        }

        let mut repo_match_results: HashMap<String, Vec<RemoteRepoMatchResult>> = HashMap::new();
        for basename in &local_basenames {
            let Some(local_archive) = local_archives.iter().find(|a| &a.basename == basename) else {
                continue;
            };
            let candidates = repo_suggestions
                .suggestions
                .get(basename)
                .cloned()
                .unwrap_or_default();
            let matches = match_repo(
                self.executor,
                &local_archive.path,
                candidates,
                &package_scratch.join(format!("repo-match-{basename}")),
                self.regenerator,
                self.changelog_generator,
            )
            .unwrap_or_default();
            repo_match_results.insert(basename.clone(), matches);
        }

        let archive_matching = archive_match_results
            .values()
            .all(|matches| matches.iter().any(|m| m.matched));
        let repo_matching = repo_match_results
            .values()
            .all(|matches| matches.iter().any(|m| m.matched));

        let archive_matches = PackageArchiveMatchesResult {
            source_package_name: package_name.to_string(),
            matching: archive_matching,
            results: archive_match_results.clone(),
            unused_declared_sources: archive_suggestions.unused_spec_sources.clone(),
            archive_hashes: archive_hashes.clone(),
            srpm_available: source_package.srpm_available(),
            spec_valid: source_package.spec_valid(),
            source_extractable: source_package.source_extractable(),
            timestamp: self.timestamp.to_string(),
        };

        let repo_matches = PackageRepoMatchesResult {
            source_package_name: package_name.to_string(),
            matching: repo_matching,
            results: repo_match_results.clone(),
            unused_declared_sources: Vec::new(),
            archive_hashes,
            srpm_available: source_package.srpm_available(),
            spec_valid: source_package.spec_valid(),
            source_extractable: source_package.source_extractable(),
            timestamp: self.timestamp.to_string(),
        };

        let upstream_archive = best_match(&archive_match_results);
        let upstream_repo = best_repo_match(&repo_match_results);

        let valid = archive_matching && repo_matching;

        let _ = std::fs::remove_dir_all(&package_scratch);

        PackageValidationResult {
            source_package_name: package_name.to_string(),
            archive_matches,
            repo_matches,
            upstream_archive,
            upstream_repo,
            valid,
            timestamp: self.timestamp.to_string(),
        }
    }
}

fn best_match(
    results: &HashMap<String, Vec<RemoteArchiveMatchResult>>,
) -> HashMap<String, Option<RemoteArchiveMatchResult>> {
    results
        .iter()
        .map(|(basename, matches)| {
            let best = matches.iter().find(|m| m.matched).cloned();
            (basename.clone(), best)
        })
        .collect()
}

fn best_repo_match(
    results: &HashMap<String, Vec<RemoteRepoMatchResult>>,
) -> HashMap<String, Option<RemoteRepoMatchResult>> {
    results
        .iter()
        .map(|(basename, matches)| {
            let best = matches.iter().find(|m| m.matched).cloned();
            (basename.clone(), best)
        })
        .collect()
}

/// Builds the package list to validate: `extra_packages` first (always included, exempt from
/// truncation), then the host's enumerated package set shuffled and truncated to `cap`.
pub fn build_fleet(
    enumerator: &dyn PackageEnumerator,
    extra_packages: &[String],
    cap: Option<usize>,
) -> Vec<String> {
    use rand::seq::SliceRandom;

    let extra: std::collections::HashSet<&str> = extra_packages.iter().map(String::as_str).collect();
    let mut rest: Vec<String> = enumerator
        .enumerate()
        .into_iter()
        .filter(|p| !extra.contains(p.as_str()))
        .collect();
    rest.shuffle(&mut rand::thread_rng());

    let mut fleet: Vec<String> = extra_packages.to_vec();
    match cap {
        Some(n) if fleet.len() < n => {
            let remaining = n - fleet.len();
            fleet.extend(rest.into_iter().take(remaining));
        }
        Some(_) => {}
        None => fleet.extend(rest),
    }
    fleet
}

/// Fans package validation out over a worker pool sized like [`crate::fs::copy_folder_parallel`].
/// A worker panic/exception is logged and its package omitted from the report rather than aborting
/// the whole run; the caller still gets every package that did succeed.
pub fn validate_fleet(
    packages: &[String],
    worker_count: usize,
    validate_one: impl Fn(&str) -> PackageValidationResult + Sync,
) -> SystemValidationResult {
    use rayon::prelude::*;

    let worker_count = worker_count.clamp(1, num_cpus::get());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .expect("failed to build validation worker pool");

    let report: HashMap<String, PackageValidationResult> = pool.install(|| {
        packages
            .par_iter()
            .filter_map(|package_name| {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    validate_one(package_name)
                }));
                match result {
                    Ok(validation) => Some((package_name.clone(), validation)),
                    Err(_) => {
                        log::error!("validation worker panicked on package {package_name}");
                        None
                    }
                }
            })
            .collect()
    });

    SystemValidationResult::new(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEnumerator(Vec<String>);
    impl PackageEnumerator for FixedEnumerator {
        fn enumerate(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn build_fleet_always_includes_extras() {
        let enumerator = FixedEnumerator(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let extras = vec!["z".to_string()];
        let fleet = build_fleet(&enumerator, &extras, Some(2));

        assert!(fleet.contains(&"z".to_string()));
        assert_eq!(fleet.len(), 2);
    }

    #[test]
    fn build_fleet_with_no_cap_includes_everything() {
        let enumerator = FixedEnumerator(vec!["a".to_string(), "b".to_string()]);
        let fleet = build_fleet(&enumerator, &[], None);
        assert_eq!(fleet.len(), 2);
    }
}
