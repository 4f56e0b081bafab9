mod cache;
#[cfg(feature = "cli")]
pub mod cli;
mod config;
pub mod consts;
mod errors;
mod fs;
mod git;
mod http;
pub mod package;
mod utils;

pub use cache::{CacheStats, FingerprintParts, OperationCache};
pub use cache::utils::get_user_cache_dir;
pub use config::{ConfigError, get_suggestions_config, get_transformations_config};
pub use errors::{ValidationError, ValidationErrors};
pub use fs::{ArchiveKind, secure_extract_archive, sniff_archive_kind};
pub use git::{CommandExecutor, GitExecutor, is_git_repo, is_release_tag};
pub use http::{Http, HttpDownload, HttpError, is_url_accessible};
pub use package::matching::{match_archive, match_repo};
pub use package::rpm::{DnfSourcePackageProvider, RpmSourcePackage};
pub use package::suggesting_archives::config::SuggestionConfig as ArchiveSuggestionConfig;
pub use package::suggesting_archives::suggest_package_archives;
pub use package::suggesting_repos::config::RepoSuggestionConfig;
pub use package::suggesting_repos::suggest_package_repos;
pub use package::validation::{PackageEnumerator, PackageValidator, build_fleet, validate_fleet};
pub use package::{
    BuildSystemRegenerator, ChangelogGenerator, InstallationDecision, LocalArchive, MatchState,
    PackageArchiveMatchesResult, PackageRemoteArchivesStats, PackageRemoteArchivesSuggestions,
    PackageRemoteReposStats, PackageRemoteReposSuggestions, PackageRepoMatchesResult,
    PackageValidationResult, ProvidedSource, ProviderError, RemoteArchiveMatchResult,
    RemoteArchiveSuggestion, RemoteRepoMatchResult, RemoteRepoSuggestion, SourcePackageProvider,
    SystemValidationResult,
};
