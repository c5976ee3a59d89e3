//! Version gating for job files.
//!
//! A job file may carry `version_range = ">=0.3.0, <0.5.0"`; its jobs only
//! run when the target project's `package.json` version satisfies it.

use semver::{Version, VersionReq};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VersionError {
    /// e.g. "not-a-version"
    #[error("invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },
    /// e.g. ">=bad"
    #[error("invalid version requirement '{value}': {reason}")]
    InvalidRequirement { value: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} has no \"version\" field")]
    MissingVersion(PathBuf),
}

/// A parsed `version_range`. No range (or a blank one) admits every version.
#[derive(Debug, Clone, Default)]
pub struct VersionGate {
    requirement: Option<VersionReq>,
}

impl VersionGate {
    pub fn parse(range: Option<&str>) -> Result<Self, VersionError> {
        let requirement = match range.map(str::trim).filter(|r| !r.is_empty()) {
            None => None,
            Some(range) => Some(VersionReq::parse(range).map_err(|e| {
                VersionError::InvalidRequirement {
                    value: range.to_string(),
                    reason: e.to_string(),
                }
            })?),
        };
        Ok(Self { requirement })
    }

    /// Whether `version` falls inside the range.
    pub fn allows(&self, version: &str) -> Result<bool, VersionError> {
        let Some(req) = &self.requirement else {
            return Ok(true);
        };
        let version = Version::parse(version.trim()).map_err(|e| VersionError::InvalidVersion {
            value: version.to_string(),
            reason: e.to_string(),
        })?;
        Ok(req.matches(&version))
    }
}

impl std::fmt::Display for VersionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.requirement {
            Some(req) => write!(f, "{req}"),
            None => write!(f, "*"),
        }
    }
}

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(default)]
    version: Option<String>,
}

/// Read the `version` field of `<root>/package.json`.
pub fn read_project_version(root: &Path) -> Result<String, ManifestError> {
    let path = root.join("package.json");
    let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    let manifest: PackageManifest =
        serde_json::from_str(&raw).map_err(|source| ManifestError::Json {
            path: path.clone(),
            source,
        })?;
    manifest
        .version
        .filter(|v| !v.trim().is_empty())
        .ok_or(ManifestError::MissingVersion(path))
}
