use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const MANIFEST_FILE: &str = "manifest.yml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read package manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse package manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("no {MANIFEST_FILE} found in {start} or any parent directory")]
    PackageRootNotFound { start: PathBuf },
}

/// The manifest fields embedded into every prompt. Other keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub package_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

impl PackageManifest {
    pub fn from_package_root(package_root: &Path) -> Result<Self, ManifestError> {
        let path = package_root.join(MANIFEST_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ManifestError::Parse { path, source })
    }
}

/// Walks from `start` up through its ancestors to the first directory
/// containing a manifest.
pub fn find_package_root(start: &Path) -> Result<PathBuf, ManifestError> {
    start
        .ancestors()
        .find(|candidate| candidate.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| ManifestError::PackageRootNotFound {
            start: start.to_path_buf(),
        })
}
