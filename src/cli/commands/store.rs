use std::path::Path;

use anyhow::Result;

use crate::package::InstallationDecision;
use crate::package::rpm::{DnfSourcePackageProvider, RpmSourcePackage};

use super::support::default_executor;

/// Fetches `package_name`'s source package and copies SPEC/SOURCE/SRPM_CONTENT into `output_dir`.
pub fn run(package_name: &str, output_dir: &Path) -> Result<()> {
    let scratch = tempfile::tempdir()?;
    let provider = DnfSourcePackageProvider::new(default_executor(), scratch.path().join("provider-work"));
    let mut package = RpmSourcePackage::new(
        package_name,
        None,
        InstallationDecision::No,
        provider,
        scratch.path().to_path_buf(),
    );
    package.initialize();
    package.store_content(output_dir)?;
    Ok(())
}
