//! Default [`SourcePackageProvider`]: shells out to the host's RPM tooling
//! (`dnf download --source`, `rpm2cpio`/`cpio`, `dnf builddep`) behind a [`CommandExecutor`],
//! mirroring how [`crate::git`] shells out to `git` itself. Kept separate from
//! [`crate::package::rpm::source_package`] so a deployment without `dnf` on `PATH` can swap in its
//! own provider without touching the adapter.

use std::path::{Path, PathBuf};
use std::process::Command;

use fs_err as fs;

use crate::git::CommandExecutor;
use crate::package::{ProvidedSource, ProviderError, SourcePackageProvider};

pub struct DnfSourcePackageProvider<E: CommandExecutor> {
    executor: E,
    work_dir: PathBuf,
}

impl<E: CommandExecutor> DnfSourcePackageProvider<E> {
    pub fn new(executor: E, work_dir: PathBuf) -> Self {
        Self { executor, work_dir }
    }

    fn package_dir(&self, package_name: &str) -> PathBuf {
        self.work_dir.join(package_name)
    }

    fn download_srpm(&self, package_name: &str, dest_dir: &Path) -> Result<PathBuf, ProviderError> {
        let mut command = Command::new("dnf");
        command
            .arg("download")
            .arg("--source")
            .arg("--destdir")
            .arg(dest_dir)
            .arg(package_name);
        self.executor
            .execute(&mut command)
            .map_err(ProviderError::Io)?;

        find_by_extension(dest_dir, ".src.rpm").ok_or_else(|| ProviderError::NotFound {
            package_name: package_name.to_string(),
        })
    }

    fn extract_srpm(&self, srpm_path: &Path, dest_dir: &Path) -> Result<(), ProviderError> {
        fs::create_dir_all(dest_dir)?;
        let shell_line = format!(
            "rpm2cpio {} | cpio --quiet -idm",
            shell_quote(&srpm_path.to_string_lossy())
        );
        let mut command = Command::new("sh");
        command.current_dir(dest_dir).arg("-c").arg(shell_line);
        self.executor
            .execute(&mut command)
            .map_err(ProviderError::Io)?;
        Ok(())
    }
}

impl<E: CommandExecutor> SourcePackageProvider for DnfSourcePackageProvider<E> {
    fn fetch(
        &self,
        package_name: &str,
        local_archive_override: Option<&Path>,
    ) -> Result<ProvidedSource, ProviderError> {
        let content_dir = self.package_dir(package_name);
        fs::create_dir_all(&content_dir)?;

        let archive_path = match local_archive_override {
            Some(path) => path.to_path_buf(),
            None => self.download_srpm(package_name, &content_dir)?,
        };

        self.extract_srpm(&archive_path, &content_dir)?;

        let spec_path = find_by_extension(&content_dir, crate::consts::SPEC_FILENAME_SUFFIX)
            .ok_or_else(|| ProviderError::NotFound {
                package_name: package_name.to_string(),
            })?;

        Ok(ProvidedSource {
            archive_path,
            content_dir,
            spec_path,
        })
    }

    fn install_build_dependencies(&self, spec_path: &Path) -> Result<(), ProviderError> {
        let mut command = Command::new("dnf");
        command.arg("builddep").arg("-y").arg(spec_path);
        self.executor
            .execute(&mut command)
            .map_err(ProviderError::Io)?;
        Ok(())
    }
}

/// Finds the single file directly under `dir` whose name ends in `suffix`. Returns `None` rather
/// than erroring when zero or more than one match, leaving the caller to surface a `NotFound`.
fn find_by_extension(dir: &Path, suffix: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix))
        })
        .collect();
    matches.sort();
    if matches.len() == 1 { matches.pop() } else { None }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct ScriptedExecutor {
        responses: RefCell<Vec<Result<String, String>>>,
    }

    impl CommandExecutor for ScriptedExecutor {
        fn execute(&self, _command: &mut Command) -> Result<String, std::io::Error> {
            match self.responses.borrow_mut().remove(0) {
                Ok(out) => Ok(out),
                Err(e) => Err(std::io::Error::other(e)),
            }
        }
    }

    #[test]
    fn fetch_uses_local_archive_override_without_downloading() {
        let tmp = tempfile::tempdir().unwrap();
        let srpm_path = tmp.path().join("acl-2.3.1.src.rpm");
        fs::write(&srpm_path, b"not a real srpm").unwrap();

        let executor = ScriptedExecutor {
            responses: RefCell::new(vec![Ok(String::new())]), // rpm2cpio | cpio
        };
        let provider = DnfSourcePackageProvider::new(executor, tmp.path().join("work"));

        // extract_srpm runs but produces nothing on disk since the executor is stubbed; place
        // the spec file ourselves to emulate a successful extraction.
        let content_dir = tmp.path().join("work").join("acl");
        fs::create_dir_all(&content_dir).unwrap();
        fs::write(content_dir.join("acl.spec"), "Name: acl\n").unwrap();

        let provided = provider.fetch("acl", Some(&srpm_path)).unwrap();
        assert_eq!(provided.archive_path, srpm_path);
        assert_eq!(provided.spec_path, content_dir.join("acl.spec"));
    }

    #[test]
    fn find_by_extension_requires_exactly_one_match() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_by_extension(tmp.path(), ".spec").is_none());

        fs::write(tmp.path().join("a.spec"), "").unwrap();
        assert_eq!(find_by_extension(tmp.path(), ".spec"), Some(tmp.path().join("a.spec")));

        fs::write(tmp.path().join("b.spec"), "").unwrap();
        assert!(find_by_extension(tmp.path(), ".spec").is_none());
    }
}
