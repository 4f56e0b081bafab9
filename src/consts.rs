//! Filenames, environment variable names and other fixed constants.

pub const SPEC_FILENAME_SUFFIX: &str = ".spec";
pub const SOURCES_DIR_NAME: &str = "SOURCES";
pub const SPECS_DIR_NAME: &str = "SPECS";
pub const SOURCE_DIR_NAME: &str = "SOURCE";
pub const SRPM_CONTENT_DIR_NAME: &str = "SRPM_CONTENT";

pub const SOCKET_TIMEOUT_ENV_VAR_NAME: &str = "PVT_SOCKET_TIMEOUT_SECONDS";
pub const DEFAULT_SOCKET_TIMEOUT_SECONDS: u64 = 10;

pub const PROBE_TIMEOUT_SECONDS: u64 = 3;
pub const API_TIMEOUT_SECONDS: u64 = 5;
pub const GIT_LS_REMOTE_TIMEOUT_SECONDS: u64 = 1;

pub const CACHE_DIR_ENV_VAR_NAME: &str = "PVT_CACHE_DIR";
pub const COPY_THREADS_ENV_VAR_NAME: &str = "PVT_COPY_THREADS";
pub const GITHUB_TOKEN_ENV_VAR_NAME: &str = "GITHUB_TOKEN";
pub const FILE_MATCHER_DIFFS_PATH_ENV_VAR_NAME: &str = "PVT_FILE_MATCHER_DIFFS_PATH";
pub const ENVROOT_ENV_VAR_NAME: &str = "ENVROOT";

pub const CONFIGURATION_DIR_NAME: &str = "configuration";

pub const MAX_RETURNED_CODE_SEARCH_REPOS: usize = 3;
pub const RATE_LIMIT_REMAINING_WARNING_THRESHOLD: i64 = 5;

pub const SYSTEM_VALIDATION_SCHEMA_VERSION: &str = "2025-09-22";

/// Tried longest-suffix-first so that e.g. `.tar.gz` is stripped in one step rather than leaving
/// a dangling `.tar`.
pub const SUPPORTED_ARCHIVE_TYPES: &[&str] = &[
    ".tar.gz", ".tar.bz2", ".tar.xz", ".tar.zst", ".tgz", ".tbz2", ".txz", ".tar", ".zip",
];

pub const BINARY_FILE_TYPES: &[&str] = &[".a", ".pdf", ".png", ".svg"];

pub const RANDOM_STRING_BASE_CHARACTERS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// base names of the well-known repo hostings tried by suggest_repo_from_known_hostings
pub const KNOWN_HOSTING_TEMPLATES: &[(&str, &str)] = &[
    ("GitHub", "https://github.com/{p}/{p}"),
    ("GitLab", "https://gitlab.com/{p}/{p}"),
    ("SourceForge", "git://git.code.sf.net/p/{p}/{p}"),
    ("Savannah", "https://git.savannah.gnu.org/git/{p}.git"),
];

/// Path components that, if present anywhere in a candidate URL, disqualify it from being a repo
/// root (it is more likely a download/issue/wiki link).
pub const NOT_GIT_REPO_HINTS: &[&str] = &[
    "archive", "archives", "blob", "branch", "branches", "bug", "bugs", "commit", "commits",
    "pull", "pulls", "dist", "doc", "docs", "download", "issue", "issues", "raw", "release",
    "releases", "search", "tag", "tags", "ticket", "tickets", "tracker", "tree", "w", "wiki",
];

pub const NOT_GIT_REPO_EXTENSIONS: &[&str] = &[
    ".asc", ".deb", ".exe", ".gz", ".htm", ".html", ".md", ".pdf", ".php", ".rpm", ".sig", ".sign",
    ".tar", ".txt", ".xz", ".zip",
];
