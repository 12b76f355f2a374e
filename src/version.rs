//! Version Source
//!
//! The stamped version comes from the project's `package.json`. It is treated
//! as opaque text; SemVer is only checked so the CLI can warn about typos.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{} has no string \"version\" field", .0.display())]
    Missing(PathBuf),
}

pub fn version_from_package_json(path: &Path) -> Result<String, VersionError> {
    let content = fs::read_to_string(path).map_err(|source| VersionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| VersionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    manifest
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| VersionError::Missing(path.to_path_buf()))
}

pub fn is_semver(version: &str) -> bool {
    semver::Version::parse(version).is_ok()
}
