use std::path::Path;

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::consts::{
    DEFAULT_SOCKET_TIMEOUT_SECONDS, RANDOM_STRING_BASE_CHARACTERS, SOCKET_TIMEOUT_ENV_VAR_NAME,
    SUPPORTED_ARCHIVE_TYPES,
};

/// Default worker count for the fleet validator, absent an explicit `--nr-processes` override.
pub(crate) fn get_max_workers() -> usize {
    num_cpus::get()
}

/// Socket timeout for ordinary downloads, overridable via `PVT_SOCKET_TIMEOUT_SECONDS`.
pub(crate) fn socket_timeout_seconds() -> u64 {
    std::env::var(SOCKET_TIMEOUT_ENV_VAR_NAME)
        .ok()
        .and_then(|x| x.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SOCKET_TIMEOUT_SECONDS)
}

/// Strips a recognized archive suffix (longest match first), falling back to the extension-less
/// stem when the file doesn't end in one of `SUPPORTED_ARCHIVE_TYPES`.
pub fn remove_archive_suffix(file: &str) -> String {
    for suffix in SUPPORTED_ARCHIVE_TYPES {
        if let Some(stem) = file.strip_suffix(suffix) {
            return stem.to_string();
        }
    }
    match Path::new(file).file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => file.to_string(),
    }
}

/// Return all lines that start with the given prefix, preserving order.
pub fn lines_starting_with<'a>(lines: &'a [String], prefix: &str) -> Vec<&'a str> {
    lines
        .iter()
        .filter(|line| line.starts_with(prefix))
        .map(|line| line.as_str())
        .collect()
}

/// Replace `:` and `/` with `-`, so a URL or path can be used as a single filesystem component.
pub fn save_path(path: &str) -> String {
    path.replace(':', "-").replace('/', "-")
}

pub fn hash256sum(path: &Path) -> std::io::Result<String> {
    let mut file = fs_err::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn hash256sum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// A random alphanumeric string, used as the shared placeholder token in date-agnostic text
/// comparison and for scratch-directory disambiguation.
pub fn generate_random_string(len: usize) -> String {
    let chars: Vec<char> = RANDOM_STRING_BASE_CHARACTERS.chars().collect();
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}

/// RAII guard that restores the previous working directory on drop, mirroring a `pushd`/`popd`
/// pair. Kept as a guard (not a plain function) so any early return or `?` still restores cwd.
pub struct Pushd {
    previous_dir: std::path::PathBuf,
}

impl Pushd {
    pub fn new(new_dir: &Path) -> std::io::Result<Self> {
        let previous_dir = std::env::current_dir()?;
        std::env::set_current_dir(new_dir)?;
        Ok(Self { previous_dir })
    }
}

impl Drop for Pushd {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_two_part_suffix() {
        assert_eq!(remove_archive_suffix("acl-2.3.1.tar.gz"), "acl-2.3.1");
        assert_eq!(remove_archive_suffix("foo.zip"), "foo");
        assert_eq!(remove_archive_suffix("foo"), "foo");
    }

    #[test]
    fn finds_source_lines() {
        let lines: Vec<String> = vec![
            "Name: foo".into(),
            "Source0: foo-1.0.tar.gz".into(),
            "Source1: bar.patch".into(),
        ];
        let sources = lines_starting_with(&lines, "Source");
        assert_eq!(sources, vec!["Source0: foo-1.0.tar.gz", "Source1: bar.patch"]);
    }

    #[test]
    fn sanitizes_path() {
        assert_eq!(save_path("https://example.com/a"), "https---example.com-a");
    }
}
