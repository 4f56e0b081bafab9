//! Shared plumbing for the subcommands: cache construction, timestamps, JSON output, and the
//! host-specific [`PackageEnumerator`] used by `validate-system-packages`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use fs_err as fs;
use serde::Serialize;

use crate::cache::OperationCache;
use crate::git::GitExecutor;
use crate::package::suggesting_archives::config::SuggestionConfig as ArchiveSuggestionConfig;
use crate::package::suggesting_repos::config::RepoSuggestionConfig;
use crate::package::validation::PackageEnumerator;

pub fn build_cache(op_cache_directory: Option<PathBuf>, override_cache: bool) -> Result<OperationCache> {
    let root = match op_cache_directory {
        Some(p) => p,
        None => crate::cache::utils::get_user_cache_dir()
            .context("could not determine a cache directory; pass --op-cache-directory")?,
    };
    fs::create_dir_all(&root)?;
    Ok(OperationCache::new(root, override_cache))
}

pub fn timestamp_now() -> String {
    jiff::Timestamp::now().to_string()
}

pub fn archive_config() -> ArchiveSuggestionConfig {
    match crate::config::get_suggestions_config() {
        Ok(map) => ArchiveSuggestionConfig::from_map(&map),
        Err(e) => {
            log::warn!("failed to load suggestions configuration, using defaults: {e}");
            ArchiveSuggestionConfig::default()
        }
    }
}

pub fn repo_config() -> RepoSuggestionConfig {
    match crate::config::get_suggestions_config() {
        Ok(map) => RepoSuggestionConfig::from_map(&map),
        Err(e) => {
            log::warn!("failed to load suggestions configuration, using defaults: {e}");
            RepoSuggestionConfig::default()
        }
    }
}

/// Writes `value` as pretty JSON to `output_json_path`, or to stdout when it's absent.
pub fn emit_json<T: Serialize>(value: &T, output_json_path: Option<&Path>) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    match output_json_path {
        Some(path) => fs::write(path, serialized)?,
        None => println!("{serialized}"),
    }
    Ok(())
}

/// Every installed package's source package, the way the teacher's system dependency scan shells
/// out to the OS package manager rather than parsing `/var/lib/rpm` directly.
pub struct RpmQueryEnumerator;

impl PackageEnumerator for RpmQueryEnumerator {
    fn enumerate(&self) -> Vec<String> {
        let output = match Command::new("rpm").arg("-qa").arg("--qf").arg("%{SOURCERPM}\n").output() {
            Ok(out) if out.status.success() => out,
            _ => {
                log::warn!("`rpm -qa` failed; returning an empty fleet");
                return Vec::new();
            }
        };

        let text = String::from_utf8_lossy(&output.stdout);
        let mut seen = HashSet::new();
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "(none)")
            .filter(|l| seen.insert(l.to_string()))
            .map(str::to_string)
            .collect()
    }
}

/// A single place for CLI command modules to construct the default [`CommandExecutor`] used for
/// every git and RPM shell-out.
pub fn default_executor() -> GitExecutor {
    GitExecutor
}
