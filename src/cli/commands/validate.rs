use std::path::PathBuf;

use anyhow::Result;

use crate::cache::OperationCache;
use crate::package::rpm::DnfSourcePackageProvider;
use crate::package::validation::{PackageValidator, build_fleet, validate_fleet};
use crate::package::{InstallationDecision, SystemValidationResult};

use super::support::{RpmQueryEnumerator, archive_config, default_executor, emit_json, repo_config, timestamp_now};

pub fn validate_package(
    package_name: &str,
    install_build_deps: InstallationDecision,
    srpm_file: Option<PathBuf>,
    output_json_path: Option<PathBuf>,
    cache: &OperationCache,
) -> Result<bool> {
    let scratch = tempfile::tempdir()?;
    let executor = default_executor();
    let archive_cfg = archive_config();
    let repo_cfg = repo_config();
    let timestamp = timestamp_now();

    let provider_factory = || DnfSourcePackageProvider::new(default_executor(), scratch.path().join("provider-work"));

    let validator = PackageValidator {
        provider_factory: &provider_factory,
        executor: &executor,
        archive_config: &archive_cfg,
        repo_config: &repo_cfg,
        cache,
        regenerator: None,
        changelog_generator: None,
        scratch_root: scratch.path(),
        timestamp: &timestamp,
        local_archive_override: srpm_file.as_deref(),
        build_deps: install_build_deps,
    };

    let result = validator.validate(package_name);
    let valid = result.valid;
    emit_json(&result, output_json_path.as_deref())?;
    Ok(valid)
}

pub fn validate_system_packages(
    nr_packages_to_check: Option<usize>,
    nr_processes: Option<usize>,
    extra_packages: Vec<String>,
    output_json_path: Option<PathBuf>,
    cache: &OperationCache,
) -> Result<bool> {
    let enumerator = RpmQueryEnumerator;
    let fleet = build_fleet(&enumerator, &extra_packages, nr_packages_to_check);

    let executor = default_executor();
    let archive_cfg = archive_config();
    let repo_cfg = repo_config();
    let timestamp = timestamp_now();
    let worker_count = nr_processes.unwrap_or_else(num_cpus::get);

    let validate_one = |package_name: &str| {
        let scratch = tempfile::tempdir().expect("failed to create per-package scratch directory");
        let provider_factory =
            || DnfSourcePackageProvider::new(default_executor(), scratch.path().join("provider-work"));
        let validator = PackageValidator {
            provider_factory: &provider_factory,
            executor: &executor,
            archive_config: &archive_cfg,
            repo_config: &repo_cfg,
            cache,
            regenerator: None,
            changelog_generator: None,
            scratch_root: scratch.path(),
            timestamp: &timestamp,
            local_archive_override: None,
            build_deps: InstallationDecision::Try,
        };
        validator.validate(package_name)
    };

    let report: SystemValidationResult = validate_fleet(&fleet, worker_count, validate_one);
    let valid = report.valid();
    emit_json(&report, output_json_path.as_deref())?;
    Ok(valid)
}
