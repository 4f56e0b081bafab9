//! Source-package adapter: owns a scratch directory, lazily fetches and parses the source
//! package, and exposes the archives/declared sources the suggestion engines need.

use std::path::{Path, PathBuf};

use fs_err as fs;

use crate::consts::{SOURCE_DIR_NAME, SPECS_DIR_NAME, SRPM_CONTENT_DIR_NAME};
use crate::fs::{get_archive_files, secure_extract_archive};
use crate::package::rpm::spec::{ParsedSpec, parse_spec};
use crate::package::{
    BuildSystemRegenerator, InstallationDecision, LocalArchive, ProvidedSource, ProviderError,
    SourcePackageProvider,
};

pub struct RpmSourcePackage<P: SourcePackageProvider> {
    package_name: String,
    local_archive_override: Option<PathBuf>,
    build_deps: InstallationDecision,
    provider: P,
    scratch_dir: PathBuf,

    provided: Option<ProvidedSource>,
    parsed_spec: Option<ParsedSpec>,
    spec_valid: bool,
    srpm_available: bool,
    source_extractable: bool,
    prepared_source_dir: Option<PathBuf>,
}

impl<P: SourcePackageProvider> RpmSourcePackage<P> {
    pub fn new(
        package_name: impl Into<String>,
        local_archive_override: Option<PathBuf>,
        build_deps: InstallationDecision,
        provider: P,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            local_archive_override,
            build_deps,
            provider,
            scratch_dir,
            provided: None,
            parsed_spec: None,
            spec_valid: false,
            srpm_available: false,
            source_extractable: false,
            prepared_source_dir: None,
        }
    }

    pub fn source_package_name(&self) -> &str {
        &self.package_name
    }

    pub fn spec_valid(&self) -> bool {
        self.spec_valid
    }

    pub fn srpm_available(&self) -> bool {
        self.srpm_available
    }

    pub fn source_extractable(&self) -> bool {
        self.source_extractable
    }

    /// Fetches the source package, optionally installs build dependencies, and parses the spec.
    /// Failures are absorbed into the `srpm_available`/`spec_valid` flags rather than propagated,
    /// matching the "always return a result object" policy.
    pub fn initialize(&mut self) {
        if self.provided.is_some() {
            return;
        }

        let provided = match self
            .provider
            .fetch(&self.package_name, self.local_archive_override.as_deref())
        {
            Ok(p) => p,
            Err(e) => {
                log::warn!("source-package provider failed for {}: {e}", self.package_name);
                return;
            }
        };

        self.srpm_available = true;

        if self.build_deps != InstallationDecision::No {
            match self.provider.install_build_dependencies(&provided.spec_path) {
                Ok(()) => {}
                Err(e) if self.build_deps == InstallationDecision::Always => {
                    log::error!("failed to install build dependencies for {}: {e}", self.package_name);
                }
                Err(e) => {
                    log::warn!("failed to install build dependencies for {}: {e}", self.package_name);
                }
            }
        }

        match fs::read_to_string(&provided.spec_path) {
            Ok(text) => match parse_spec(&text) {
                Ok(parsed) => {
                    self.parsed_spec = Some(parsed);
                    self.spec_valid = true;
                }
                Err(e) => {
                    log::warn!("failed to parse spec for {}: {e}", self.package_name);
                }
            },
            Err(e) => {
                log::warn!("failed to read spec file {}: {e}", provided.spec_path.display());
            }
        }

        self.source_extractable = provided.content_dir.is_dir();
        self.prepared_source_dir = Some(provided.content_dir.clone());
        self.provided = Some(provided);
    }

    /// Runs the build-system regenerator over the raw extracted content; on failure, falls back
    /// to the raw content and continues (the spec still reports `source_extractable`).
    pub fn regenerate_source(&mut self, regenerator: &impl BuildSystemRegenerator, autotools_cache_dir: &Path) {
        let Some(provided) = &self.provided else { return };
        match regenerator.regenerate(&provided.content_dir, autotools_cache_dir) {
            Ok(_) => {}
            Err(e) => {
                log::warn!(
                    "build-system regeneration failed for {}, falling back to raw content: {e}",
                    self.package_name
                );
            }
        }
    }

    /// `(local archive paths+hashes, declared-source strings)`.
    pub fn local_and_declared_archives(&self) -> (Vec<LocalArchive>, Vec<String>) {
        let Some(provided) = &self.provided else {
            return (Vec::new(), Vec::new());
        };

        let archives = get_archive_files(&provided.content_dir)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|path| {
                let bytes = fs::read(&path).ok()?;
                let sha256 = crate::utils::hash256sum_bytes(&bytes);
                let basename = path.file_name()?.to_string_lossy().into_owned();
                Some(LocalArchive { path, basename, sha256 })
            })
            .collect();

        let sources = self
            .parsed_spec
            .as_ref()
            .map(|s| s.sources.clone())
            .unwrap_or_default();

        (archives, sources)
    }

    /// Every declared-URL substring found anywhere in the spec text, a superset of declared
    /// sources used for repo-hunting.
    pub fn repository_urls(&self) -> Vec<String> {
        self.parsed_spec
            .as_ref()
            .map(|s| s.declared_urls.clone())
            .unwrap_or_default()
    }

    /// Copies the SPEC file, prepared source tree, and raw extracted source into
    /// `<output_dir>/{SPECS,SOURCE,SRPM_CONTENT}`.
    pub fn store_content(&self, output_dir: &Path) -> std::io::Result<()> {
        let Some(provided) = &self.provided else {
            return Ok(());
        };

        let specs_dir = output_dir.join(SPECS_DIR_NAME);
        fs::create_dir_all(&specs_dir)?;
        if let Some(name) = provided.spec_path.file_name() {
            fs::copy(&provided.spec_path, specs_dir.join(name))?;
        }

        if let Some(prepared) = &self.prepared_source_dir {
            crate::fs::copy_folder(prepared, output_dir.join(SOURCE_DIR_NAME))?;
        }

        crate::fs::copy_folder(&provided.content_dir, output_dir.join(SRPM_CONTENT_DIR_NAME))?;

        Ok(())
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Unpacks a freshly downloaded archive's bytes into a subdirectory of the scratch dir and
    /// returns the directory plus content hash.
    pub fn extract_scratch(&self, label: &str, bytes: &[u8]) -> std::io::Result<(PathBuf, String)> {
        let dest = self.scratch_dir.join(label);
        let hash = secure_extract_archive(bytes, &dest)?.unwrap_or_default();
        Ok((dest, hash))
    }
}

impl<P: SourcePackageProvider> Drop for RpmSourcePackage<P> {
    fn drop(&mut self) {
        if self.scratch_dir.is_dir() {
            let _ = fs::remove_dir_all(&self.scratch_dir);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestSourcePackageProvider {
    pub content: std::collections::HashMap<String, ProvidedSourceFixture>,
}

#[derive(Debug, Clone)]
pub struct ProvidedSourceFixture {
    pub archive_path: PathBuf,
    pub content_dir: PathBuf,
    pub spec_path: PathBuf,
}

impl SourcePackageProvider for TestSourcePackageProvider {
    fn fetch(
        &self,
        package_name: &str,
        _local_archive_override: Option<&Path>,
    ) -> Result<ProvidedSource, ProviderError> {
        self.content
            .get(package_name)
            .map(|fixture| ProvidedSource {
                archive_path: fixture.archive_path.clone(),
                content_dir: fixture.content_dir.clone(),
                spec_path: fixture.spec_path.clone(),
            })
            .ok_or_else(|| ProviderError::NotFound {
                package_name: package_name.to_string(),
            })
    }

    fn install_build_dependencies(&self, _spec_path: &Path) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_absorbs_provider_failure() {
        let provider = TestSourcePackageProvider::default();
        let tmp = tempfile::tempdir().unwrap();
        let mut pkg = RpmSourcePackage::new(
            "missing-pkg",
            None,
            InstallationDecision::No,
            provider,
            tmp.path().join("scratch"),
        );

        pkg.initialize();

        assert!(!pkg.srpm_available());
        assert!(!pkg.spec_valid());
        let (archives, sources) = pkg.local_and_declared_archives();
        assert!(archives.is_empty());
        assert!(sources.is_empty());
    }

    #[test]
    fn initialize_parses_spec_on_success() {
        let tmp = tempfile::tempdir().unwrap();
        let content_dir = tmp.path().join("content");
        fs::create_dir_all(&content_dir).unwrap();
        let spec_path = tmp.path().join("acl.spec");
        fs::write(
            &spec_path,
            "Name: acl\nVersion: 2.3.1\nSource0: https://example.com/acl-2.3.1.tar.gz\n",
        )
        .unwrap();

        let mut provider = TestSourcePackageProvider::default();
        provider.content.insert(
            "acl".to_string(),
            ProvidedSourceFixture {
                archive_path: tmp.path().join("acl.src.rpm"),
                content_dir: content_dir.clone(),
                spec_path,
            },
        );

        let mut pkg = RpmSourcePackage::new(
            "acl",
            None,
            InstallationDecision::No,
            provider,
            tmp.path().join("scratch"),
        );
        pkg.initialize();

        assert!(pkg.srpm_available());
        assert!(pkg.spec_valid());
        assert_eq!(pkg.repository_urls().len(), 1);
    }
}
