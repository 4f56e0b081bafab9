use std::path::PathBuf;

use etcetera::BaseStrategy;
use sha2::{Digest, Sha256};

/// Try to get where the cache dir should be, honoring `PVT_CACHE_DIR` before falling back to the
/// OS cache-specific directory.
pub fn get_user_cache_dir() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(crate::consts::CACHE_DIR_ENV_VAR_NAME) {
        return Some(PathBuf::from(p));
    }

    etcetera::base_strategy::choose_base_strategy()
        .ok()
        .map(|dirs| dirs.cache_dir().join("pvt"))
}

/// Equivalent to sha256(input)[:10], used as a readable-but-bounded directory component.
pub fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.to_ascii_lowercase().as_bytes());
    let result = format!("{:x}", hasher.finalize());
    result[..10].to_string()
}
