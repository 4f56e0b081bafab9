//! Package-provenance data model.
//!
//! Every type below is the payload of one of the JSON schemas in the external interface: local
//! archives, suggestions, match results, and the package/system-level roll-ups. Fields kept purely
//! for internal bookkeeping are marked `#[serde(skip_serializing)]` rather than relying on a
//! naming convention.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod matching;
pub mod rpm;
pub mod suggesting_archives;
pub mod suggesting_repos;
pub mod validation;

use crate::cache::FingerprintParts;

/// A source archive found inside an extracted source package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalArchive {
    pub path: PathBuf,
    pub basename: String,
    pub sha256: String,
}

impl FingerprintParts for LocalArchive {
    fn fingerprint_parts(&self) -> Vec<(String, String)> {
        vec![
            ("basename".to_string(), self.basename.clone()),
            ("sha256".to_string(), self.sha256.clone()),
        ]
    }
}

/// How eagerly to install build dependencies before regenerating the build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationDecision {
    Always,
    Try,
    No,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteArchiveSuggestion {
    pub remote_archive: String,
    pub originating_spec_source: Option<String>,
    pub method_name: String,
    pub notes: Option<String>,
    pub confidence: f64,
}

impl FingerprintParts for RemoteArchiveSuggestion {
    fn fingerprint_parts(&self) -> Vec<(String, String)> {
        vec![
            ("remote_archive".to_string(), self.remote_archive.clone()),
            ("method_name".to_string(), self.method_name.clone()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRepoSuggestion {
    pub repo_url: String,
    pub originating_spec_source: Option<String>,
    pub method_name: String,
    pub notes: Option<String>,
    pub confidence: f64,
    pub commit_hash: Option<String>,
    pub tag: Option<String>,
}

impl FingerprintParts for RemoteRepoSuggestion {
    fn fingerprint_parts(&self) -> Vec<(String, String)> {
        vec![
            ("repo_url".to_string(), self.repo_url.clone()),
            ("method_name".to_string(), self.method_name.clone()),
        ]
    }
}

/// Describes a rewrite applied to `(local_archives, declared_sources)` before suggestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalArchiveTransformation {
    pub name: String,
    pub input_local_archives: Vec<String>,
    pub input_spec_sources: Vec<String>,
    pub output_local_archives: Vec<String>,
    pub output_spec_sources: Vec<String>,
    pub notes: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRemoteArchivesSuggestions {
    pub source_package_name: String,
    pub orig_local_archives: Vec<String>,
    pub orig_spec_sources: Vec<String>,
    pub trans_local_archives: Vec<String>,
    pub trans_spec_sources: Vec<String>,
    pub transformations: Vec<LocalArchiveTransformation>,
    pub suggestions: HashMap<String, Vec<RemoteArchiveSuggestion>>,
    pub unused_spec_sources: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageRemoteArchivesStats {
    pub transformations_applied: usize,
    pub suggested_local_archives: usize,
    pub total_local_archives: usize,
    pub suggested_archives_ratio: f64,
    pub unused_spec_sources: usize,
    pub all_spec_sources: usize,
    pub unused_specs_ratio: f64,
}

impl PackageRemoteArchivesStats {
    pub fn from_suggestions(suggestions: &PackageRemoteArchivesSuggestions) -> Self {
        let total_local_archives = suggestions.trans_local_archives.len();
        let suggested_local_archives = suggestions
            .suggestions
            .values()
            .filter(|v| !v.is_empty())
            .count();
        let all_spec_sources = suggestions.trans_spec_sources.len();
        let unused = suggestions.unused_spec_sources.len();

        Self {
            transformations_applied: suggestions.transformations.len(),
            suggested_local_archives,
            total_local_archives,
            suggested_archives_ratio: ratio(suggested_local_archives, total_local_archives),
            unused_spec_sources: unused,
            all_spec_sources,
            unused_specs_ratio: ratio(unused, all_spec_sources),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRemoteReposSuggestions {
    pub source_package_name: String,
    pub suggestions: HashMap<String, Vec<RemoteRepoSuggestion>>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageRemoteReposStats {
    pub suggested_local_archives: usize,
    pub total_local_archives: usize,
    pub suggested_archives_ratio: f64,
}

impl PackageRemoteReposStats {
    pub fn from_suggestions(suggestions: &PackageRemoteReposSuggestions) -> Self {
        let total_local_archives = suggestions.suggestions.len();
        let suggested_local_archives = suggestions
            .suggestions
            .values()
            .filter(|v| !v.is_empty())
            .count();

        Self {
            suggested_local_archives,
            total_local_archives,
            suggested_archives_ratio: ratio(suggested_local_archives, total_local_archives),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    Matching,
    Different,
    NoCounterpart,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteArchiveMatchResult {
    pub remote_archive_url: String,
    pub accessible: bool,
    pub matched: bool,
    pub files_total: usize,
    pub files_matched: usize,
    pub files_different: usize,
    pub files_no_counterpart: usize,
    pub matched_ratio: f64,
    pub different_ratio: f64,
    pub no_counterpart_ratio: f64,
    pub conflicts: HashMap<String, MatchState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteRepoMatchResult {
    pub repo_url: String,
    pub accessible: bool,
    pub matched: bool,
    pub files_total: usize,
    pub files_matched: usize,
    pub files_different: usize,
    pub files_no_counterpart: usize,
    pub matched_ratio: f64,
    pub different_ratio: f64,
    pub no_counterpart_ratio: f64,
    pub conflicts: HashMap<String, MatchState>,
    pub commit_hash: Option<String>,
    pub tag: Option<String>,
    pub build_system_regenerated: bool,
    pub detected_tool_versions: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageArchiveMatchesResult {
    pub source_package_name: String,
    pub matching: bool,
    pub results: HashMap<String, Vec<RemoteArchiveMatchResult>>,
    pub unused_declared_sources: Vec<String>,
    pub archive_hashes: HashMap<String, String>,
    pub srpm_available: bool,
    pub spec_valid: bool,
    pub source_extractable: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRepoMatchesResult {
    pub source_package_name: String,
    pub matching: bool,
    pub results: HashMap<String, Vec<RemoteRepoMatchResult>>,
    pub unused_declared_sources: Vec<String>,
    pub archive_hashes: HashMap<String, String>,
    pub srpm_available: bool,
    pub spec_valid: bool,
    pub source_extractable: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageValidationResult {
    pub source_package_name: String,
    pub archive_matches: PackageArchiveMatchesResult,
    pub repo_matches: PackageRepoMatchesResult,
    pub upstream_archive: HashMap<String, Option<RemoteArchiveMatchResult>>,
    pub upstream_repo: HashMap<String, Option<RemoteRepoMatchResult>>,
    pub valid: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemValidationResult {
    pub report: HashMap<String, PackageValidationResult>,
    pub version: String,
}

impl SystemValidationResult {
    pub fn new(report: HashMap<String, PackageValidationResult>) -> Self {
        Self {
            report,
            version: crate::consts::SYSTEM_VALIDATION_SCHEMA_VERSION.to_string(),
        }
    }

    pub fn valid(&self) -> bool {
        self.report.values().all(|r| r.valid)
    }
}

/// A source archive plus the directory it was extracted into, as handed back by the out-of-scope
/// source-package provider.
#[derive(Debug, Clone)]
pub struct ProvidedSource {
    pub archive_path: PathBuf,
    pub content_dir: PathBuf,
    pub spec_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no source package found for {package_name}")]
    NotFound { package_name: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Narrow contract over the host package manager's source-package tooling (e.g. `dnf
/// download --source` + `rpm2cpio` on RPM-based systems). Kept out of the core pipeline: a
/// real implementation shells out behind a `CommandExecutor`, matching the teacher's
/// `git::CommandExecutor` pattern, but it is not part of this crate's provenance-matching logic.
pub trait SourcePackageProvider {
    fn fetch(
        &self,
        package_name: &str,
        local_archive_override: Option<&std::path::Path>,
    ) -> Result<ProvidedSource, ProviderError>;

    fn install_build_dependencies(&self, spec_path: &std::path::Path) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Default)]
pub struct RegenerationOutcome {
    pub tool_versions: HashMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegenerationError {
    #[error("build-system regeneration failed: {0}")]
    Failed(String),
}

/// Narrow contract over the autotools-style regenerator that turns a raw extracted source tree
/// into a buildable one (patches applied, `configure` regenerated).
pub trait BuildSystemRegenerator {
    fn regenerate(
        &self,
        content_dir: &std::path::Path,
        autotools_cache_dir: &std::path::Path,
    ) -> Result<RegenerationOutcome, RegenerationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChangelogError {
    #[error("changelog generation failed: {0}")]
    Failed(String),
}

/// Narrow contract over the changelog-regeneration helper invoked before repo matching. Errors
/// from this trait are always downgraded to a warning by callers -- it never fails the match.
pub trait ChangelogGenerator {
    fn generate(
        &self,
        repo_dir: &std::path::Path,
        archive_dir: &std::path::Path,
    ) -> Result<(), ChangelogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_zero_denominator() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(1, 2), 0.5);
    }

    #[test]
    fn system_validation_result_is_valid_only_when_every_package_is() {
        let mut report = HashMap::new();
        report.insert(
            "pkg-a".to_string(),
            make_result("pkg-a", true),
        );
        let mut result = SystemValidationResult::new(report.clone());
        assert!(result.valid());

        report.insert("pkg-b".to_string(), make_result("pkg-b", false));
        result = SystemValidationResult::new(report);
        assert!(!result.valid());
    }

    fn make_result(name: &str, valid: bool) -> PackageValidationResult {
        PackageValidationResult {
            source_package_name: name.to_string(),
            archive_matches: PackageArchiveMatchesResult {
                source_package_name: name.to_string(),
                matching: valid,
                results: HashMap::new(),
                unused_declared_sources: vec![],
                archive_hashes: HashMap::new(),
                srpm_available: true,
                spec_valid: true,
                source_extractable: true,
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            },
            repo_matches: PackageRepoMatchesResult {
                source_package_name: name.to_string(),
                matching: valid,
                results: HashMap::new(),
                unused_declared_sources: vec![],
                archive_hashes: HashMap::new(),
                srpm_available: true,
                spec_valid: true,
                source_extractable: true,
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            },
            upstream_archive: HashMap::new(),
            upstream_repo: HashMap::new(),
            valid,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }
}
