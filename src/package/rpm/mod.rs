pub mod provider;
pub mod spec;
pub mod source_package;

pub use provider::DnfSourcePackageProvider;
pub use source_package::RpmSourcePackage;
