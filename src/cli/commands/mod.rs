mod cache;
mod match_files;
mod match_package;
mod store;
mod suggest;
mod support;
mod validate;

pub use cache::run as cache;
pub use match_files::run as match_files;
pub use match_package::{match_archives, match_repos};
pub use store::run as store_package;
pub use suggest::{suggest_archives, suggest_repos};
pub use support::{build_cache, timestamp_now};
pub use validate::{validate_package, validate_system_packages};
