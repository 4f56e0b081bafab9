//! Crate-wide error taxonomy.
//!
//! Mirrors the shape of a typical aggregate-and-kind error split: one `thiserror` enum for the
//! kinds a single operation can fail with, and a thin aggregation wrapper for fan-out callers
//! (the fleet validator) that need to report many independent failures at once.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("source package provider could not produce a source archive for {package_name}")]
    ProviderUnavailable { package_name: String },

    #[error("package specification invalid: {reason}")]
    SpecInvalid { reason: String },

    #[error("source tree for {package_name} could not be extracted or regenerated")]
    SourceUnextractable { package_name: String },

    #[error("unsupported package type: {0}")]
    UnsupportedPackageType(String),

    #[error("input JSON at {path} is missing required key `{key}`")]
    MalformedInputJson { path: PathBuf, key: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] crate::http::HttpError),

    #[error("cache I/O error for key {key}: {source}")]
    CacheIo {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregates per-package failures from a fleet-wide run, so the caller can log a single
/// coherent report instead of an unordered pile of individual errors.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    pub errors: Vec<(String, ValidationError)>,
}

impl ValidationErrors {
    pub fn push(&mut self, package_name: impl Into<String>, error: ValidationError) {
        self.errors.push((package_name.into(), error));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} package(s) failed validation:", self.errors.len())?;
        for (package_name, error) in &self.errors {
            writeln!(f, "  {package_name}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
