//! Git plumbing, shelled out via [`CommandExecutor`] so tests can substitute a fake.
//!
//! Every operation here is read-oriented: we never push, never write local config, and clone with
//! `--no-checkout --filter=blob:none` so probing a candidate repo's tags costs a handful of
//! kilobytes rather than a full working tree.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use regex::Regex;
use std::sync::OnceLock;

use crate::consts::GIT_LS_REMOTE_TIMEOUT_SECONDS;

pub trait CommandExecutor {
    fn execute(&self, command: &mut Command) -> Result<String, std::io::Error>;
}

#[derive(Debug, Clone)]
pub struct GitExecutor;

impl CommandExecutor for GitExecutor {
    fn execute(&self, command: &mut Command) -> Result<String, std::io::Error> {
        let res = command.output()?;
        if res.status.success() {
            Ok(String::from_utf8_lossy(&res.stdout).trim().to_string())
        } else {
            Err(std::io::Error::other(String::from_utf8_lossy(&res.stderr)))
        }
    }
}

/// Clones `url` into `dest` as a minimal bare-ish checkout: no working tree, blobs fetched lazily.
/// This is enough to list tags and resolve tree hashes without downloading file content we'll
/// usually throw away (only the matched archive's tree actually needs its blobs).
pub fn clone_minimal(
    executor: &impl CommandExecutor,
    url: &str,
    dest: &Path,
) -> Result<(), std::io::Error> {
    let mut command = Command::new("git");
    command
        .env("GIT_TERMINAL_PROMPT", "0")
        .arg("clone")
        .arg("--no-checkout")
        .arg("--filter=blob:none")
        .arg(url)
        .arg(dest);
    executor.execute(&mut command)?;
    Ok(())
}

/// Lists every tag in a local clone, newest-unsorted (git's own default order).
pub fn list_tags(executor: &impl CommandExecutor, repo_dir: &Path) -> Result<Vec<String>, std::io::Error> {
    let mut command = Command::new("git");
    command.current_dir(repo_dir).arg("tag").arg("--list");
    let out = executor.execute(&mut command)?;
    Ok(out.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
}

/// Resolves `<ref>^{tree}` to a tree hash, the value we compare between local and remote trees
/// instead of diffing file-by-file for every archive.
pub fn tree_hash(
    executor: &impl CommandExecutor,
    repo_dir: &Path,
    reference: &str,
) -> Result<Option<String>, std::io::Error> {
    let mut command = Command::new("git");
    command
        .current_dir(repo_dir)
        .arg("rev-parse")
        .arg(format!("{reference}^{{tree}}"));
    match executor.execute(&mut command) {
        Ok(out) => Ok(Some(out)),
        Err(_) => Ok(None),
    }
}

/// Checks out `reference` into the working tree of a minimal clone, fetching the single commit it
/// needs first since `clone_minimal` leaves blobs and the ref's commit unfetched.
pub fn checkout(
    executor: &impl CommandExecutor,
    repo_dir: &Path,
    reference: &str,
) -> Result<(), std::io::Error> {
    let mut fetch = Command::new("git");
    fetch
        .current_dir(repo_dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .arg("fetch")
        .arg("--depth=1")
        .arg("origin")
        .arg(reference);
    let _ = executor.execute(&mut fetch);

    let mut checkout = Command::new("git");
    checkout
        .current_dir(repo_dir)
        .arg("checkout")
        .arg("--force")
        .arg(reference);
    executor.execute(&mut checkout)?;
    Ok(())
}

/// Confirms a commit hash actually exists in the repository (`git rev-parse --verify`).
pub fn verify_commit_exists(
    executor: &impl CommandExecutor,
    repo_dir: &Path,
    commit: &str,
) -> bool {
    let mut command = Command::new("git");
    command
        .current_dir(repo_dir)
        .arg("rev-parse")
        .arg("--verify")
        .arg(format!("{commit}^{{commit}}"));
    executor.execute(&mut command).is_ok()
}

/// Release tags we never want to suggest as the "best" match: development snapshots, release
/// candidates, prereleases, and glibc's daily-snapshot naming (`2_38_9000`, `2_38_20230925`).
fn release_tag_exclusion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            (?:^|[-_.])(dev|devel|candidate|prerelease|alpha|beta|gamma|delta|pre|docs)(?:[-_.]|$)
            | (?:^|[-_.])r?c[-_.]?\d+$
            | (?:^|[-_.])pre\d+$
            ",
        )
        .unwrap()
    })
}

fn glibc_snapshot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+_\d+_\d+_\d{8}$|^\d+_\d+_9000$").unwrap())
}

/// Is this a tag we'd consider a genuine release, as opposed to a development/prerelease marker?
pub fn is_release_tag(tag: &str) -> bool {
    if glibc_snapshot_re().is_match(tag) {
        return false;
    }
    !release_tag_exclusion_re().is_match(tag)
}

/// Caches `is_git_repo` results for the life of the process: the suggestion pipeline probes the
/// same small set of hosting templates for every package, and an `ls-remote` round trip is
/// expensive enough (network + process spawn) to be worth memoizing even within one run.
static IS_GIT_REPO_CACHE: OnceLock<Mutex<HashMap<String, bool>>> = OnceLock::new();

fn is_git_repo_cache() -> &'static Mutex<HashMap<String, bool>> {
    IS_GIT_REPO_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Cheap `git ls-remote` probe with a hard 1s timeout: used to decide whether a candidate URL is
/// worth a full clone, not to validate content.
pub fn is_git_repo(url: &str) -> bool {
    if let Some(cached) = is_git_repo_cache().lock().unwrap().get(url) {
        return *cached;
    }

    let result = probe_ls_remote(url);
    is_git_repo_cache()
        .lock()
        .unwrap()
        .insert(url.to_string(), result);
    result
}

fn probe_ls_remote(url: &str) -> bool {
    use std::io::Read;
    use std::process::Stdio;

    let mut child = match Command::new("git")
        .env("GIT_TERMINAL_PROMPT", "0")
        .arg("ls-remote")
        .arg("--exit-code")
        .arg(url)
        .arg("HEAD")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(_) => return false,
    };

    let deadline = Instant::now() + Duration::from_secs(GIT_LS_REMOTE_TIMEOUT_SECONDS);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if let Some(mut stderr) = child.stderr.take() {
                    let mut buf = String::new();
                    let _ = stderr.read_to_string(&mut buf);
                }
                return status.success();
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(_) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_prerelease_and_snapshot_tags() {
        assert!(!is_release_tag("v1.2.0-rc1"));
        assert!(!is_release_tag("1.2.0-beta"));
        assert!(!is_release_tag("2_38_9000"));
        assert!(!is_release_tag("2_38_20230925"));
        assert!(is_release_tag("v1.2.0"));
        assert!(is_release_tag("2_38"));
    }
}
