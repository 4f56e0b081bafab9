mod commands;
mod utils;

pub use commands::{
    build_cache, cache, match_archives, match_files, match_repos, store_package, suggest_archives,
    suggest_repos, timestamp_now, validate_package, validate_system_packages,
};
pub use utils::{OutputFormat, timeit, write_err};
