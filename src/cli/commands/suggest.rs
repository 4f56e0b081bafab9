use std::path::PathBuf;

use anyhow::Result;

use crate::package::InstallationDecision;
use crate::package::rpm::{DnfSourcePackageProvider, RpmSourcePackage};
use crate::package::suggesting_archives;
use crate::package::suggesting_repos;

use super::support::{archive_config, default_executor, emit_json, repo_config, timestamp_now};

fn open_source_package(
    package_name: &str,
    srpm_file: Option<PathBuf>,
    scratch_dir: PathBuf,
) -> RpmSourcePackage<DnfSourcePackageProvider<crate::git::GitExecutor>> {
    let provider = DnfSourcePackageProvider::new(default_executor(), scratch_dir.join("provider-work"));
    let mut package = RpmSourcePackage::new(
        package_name,
        srpm_file,
        InstallationDecision::No,
        provider,
        scratch_dir,
    );
    package.initialize();
    package
}

pub fn suggest_archives(
    package_name: &str,
    srpm_file: Option<PathBuf>,
    output_json_path: Option<PathBuf>,
) -> Result<bool> {
    let scratch = tempfile::tempdir()?;
    let package = open_source_package(package_name, srpm_file, scratch.path().to_path_buf());
    let (local_archives, declared_sources) = package.local_and_declared_archives();
    let local_basenames: Vec<String> = local_archives.into_iter().map(|a| a.basename).collect();

    let config = archive_config();
    let suggestions = suggesting_archives::suggest_package_archives(
        package_name,
        local_basenames,
        declared_sources,
        package.scratch_dir(),
        &config,
        timestamp_now(),
    );

    let every_archive_suggested = suggestions.suggestions.values().all(|v| !v.is_empty());
    emit_json(&suggestions, output_json_path.as_deref())?;
    Ok(every_archive_suggested)
}

pub fn suggest_repos(
    package_name: &str,
    srpm_file: Option<PathBuf>,
    output_json_path: Option<PathBuf>,
) -> Result<bool> {
    let scratch = tempfile::tempdir()?;
    let package = open_source_package(package_name, srpm_file, scratch.path().to_path_buf());
    let (local_archives, declared_sources) = package.local_and_declared_archives();
    let local_basenames: Vec<String> = local_archives.into_iter().map(|a| a.basename).collect();
    let repository_urls = package.repository_urls();
    let declared_sources: Vec<String> = declared_sources.into_iter().chain(repository_urls).collect();

    let config = repo_config();
    let executor = default_executor();
    let work_dir = scratch.path().join("repo-suggestions");
    let suggestions = suggesting_repos::suggest_package_repos(
        &executor,
        package_name,
        &local_basenames,
        &declared_sources,
        &config,
        &work_dir,
        timestamp_now(),
    );

    let every_archive_suggested = suggestions.suggestions.values().all(|v| !v.is_empty());
    emit_json(&suggestions, output_json_path.as_deref())?;
    Ok(every_archive_suggested)
}
