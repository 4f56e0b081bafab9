use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fs_err as fs;

use crate::package::matching::{match_archive, match_repo};
use crate::package::rpm::{DnfSourcePackageProvider, RpmSourcePackage};
use crate::package::{
    InstallationDecision, PackageArchiveMatchesResult, PackageRemoteArchivesSuggestions,
    PackageRemoteReposSuggestions, PackageRepoMatchesResult, RemoteArchiveMatchResult,
    RemoteRepoMatchResult,
};

use super::support::{archive_config, default_executor, emit_json, repo_config, timestamp_now};

fn open_source_package(
    package_name: &str,
    scratch_dir: PathBuf,
) -> RpmSourcePackage<DnfSourcePackageProvider<crate::git::GitExecutor>> {
    let provider = DnfSourcePackageProvider::new(default_executor(), scratch_dir.join("provider-work"));
    let mut package = RpmSourcePackage::new(package_name, None, InstallationDecision::No, provider, scratch_dir);
    package.initialize();
    package
}

pub fn match_archives(
    package_name: &str,
    input_archives_json_path: Option<PathBuf>,
    output_json_path: Option<PathBuf>,
) -> Result<bool> {
    let scratch = tempfile::tempdir()?;
    let package = open_source_package(package_name, scratch.path().to_path_buf());
    let (local_archives, declared_sources) = package.local_and_declared_archives();
    let local_basenames: Vec<String> = local_archives.iter().map(|a| a.basename.clone()).collect();
    let archive_hashes: HashMap<String, String> = local_archives
        .iter()
        .map(|a| (a.basename.clone(), a.sha256.clone()))
        .collect();

    let suggestions: PackageRemoteArchivesSuggestions = match input_archives_json_path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => crate::package::suggesting_archives::suggest_package_archives(
            package_name,
            local_basenames.clone(),
            declared_sources,
            package.scratch_dir(),
            &archive_config(),
            timestamp_now(),
        ),
    };

    let mut results: HashMap<String, Vec<RemoteArchiveMatchResult>> = HashMap::new();
    for basename in &local_basenames {
        let Some(local_archive) = local_archives.iter().find(|a| &a.basename == basename) else {
            continue;
        };
        let candidates = suggestions.suggestions.get(basename).cloned().unwrap_or_default();
        let matched = match_archive(
            &local_archive.path,
            candidates,
            &scratch.path().join(format!("match-{basename}")),
        );
        results.insert(basename.clone(), matched);
    }

    let matching = results.values().all(|matches| matches.iter().any(|m| m.matched));

    let report = PackageArchiveMatchesResult {
        source_package_name: package_name.to_string(),
        matching,
        results,
        unused_declared_sources: suggestions.unused_spec_sources,
        archive_hashes,
        srpm_available: package.srpm_available(),
        spec_valid: package.spec_valid(),
        source_extractable: package.source_extractable(),
        timestamp: timestamp_now(),
    };
    emit_json(&report, output_json_path.as_deref())?;
    Ok(matching)
}

pub fn match_repos(
    package_name: &str,
    input_repos_json_path: Option<PathBuf>,
    apply_autotools: bool,
    output_json_path: Option<PathBuf>,
) -> Result<bool> {
    if apply_autotools {
        log::warn!("--apply-autotools was requested but no build-system regenerator is wired up; ignoring");
    }

    let scratch = tempfile::tempdir()?;
    let package = open_source_package(package_name, scratch.path().to_path_buf());
    let (local_archives, declared_sources) = package.local_and_declared_archives();
    let local_basenames: Vec<String> = local_archives.iter().map(|a| a.basename.clone()).collect();
    let archive_hashes: HashMap<String, String> = local_archives
        .iter()
        .map(|a| (a.basename.clone(), a.sha256.clone()))
        .collect();

    let executor = default_executor();

    let suggestions: PackageRemoteReposSuggestions = match input_repos_json_path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => {
            let declared_sources: Vec<String> =
                declared_sources.into_iter().chain(package.repository_urls()).collect();
            crate::package::suggesting_repos::suggest_package_repos(
                &executor,
                package_name,
                &local_basenames,
                &declared_sources,
                &repo_config(),
                &scratch.path().join("repo-suggestions"),
                timestamp_now(),
            )
        }
    };

    let mut results: HashMap<String, Vec<RemoteRepoMatchResult>> = HashMap::new();
    for basename in &local_basenames {
        let Some(local_archive) = local_archives.iter().find(|a| &a.basename == basename) else {
            continue;
        };
        let candidates = suggestions.suggestions.get(basename).cloned().unwrap_or_default();
        let matched = match_repo(
            &executor,
            &local_archive.path,
            candidates,
            &scratch.path().join(format!("match-{basename}")),
            None,
            None,
        )?;
        results.insert(basename.clone(), matched);
    }

    let matching = results.values().all(|matches| matches.iter().any(|m| m.matched));

    let report = PackageRepoMatchesResult {
        source_package_name: package_name.to_string(),
        matching,
        results,
        unused_declared_sources: Vec::new(),
        archive_hashes,
        srpm_available: package.srpm_available(),
        spec_valid: package.spec_valid(),
        source_extractable: package.source_extractable(),
        timestamp: timestamp_now(),
    };
    emit_json(&report, output_json_path.as_deref())?;
    Ok(matching)
}
