//! Lexical capability sandbox for tool-driven filesystem access.
//!
//! Paths are resolved by joining and collapsing `.`/`..` components without
//! touching the filesystem. Symlinks inside the package are not followed or
//! checked, so a link pointing outside the root is not detected.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Subdirectory (relative to the package root) the write capability is bound to.
pub const DOCS_WRITE_SUBDIR: &str = "_dev/build/docs";
/// Generated document the session backs up, validates, and restores.
pub const TARGET_DOCUMENT: &str = "_dev/build/docs/README.md";
/// Root-relative subpaths hidden from enumeration and reads.
pub const EXCLUDED_SUBPATHS: [&str; 1] = ["docs"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("access denied: path outside package root")]
    OutsideRoot,
    #[error("access denied: invalid path")]
    Excluded,
    #[error("access denied: path outside allowed directory")]
    OutsideWriteDir,
    #[error("access denied: _dev/build/docs/README.md must stay a file")]
    BelowTargetDocument,
    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),
}

/// Resolves `requested` against `root` lexically.
///
/// An empty request resolves to `root` itself. Absolute requests are accepted
/// only when they normalize to a location inside `root`.
pub fn resolve(root: &Path, requested: &str) -> Result<PathBuf, SandboxError> {
    let root = normalize(root);
    let joined = root.join(requested);
    let normalized = normalize(&joined);

    let relative = normalized
        .strip_prefix(&root)
        .map_err(|_| SandboxError::OutsideRoot)?;
    if relative
        .components()
        .next()
        .is_some_and(|component| component == Component::ParentDir)
    {
        return Err(SandboxError::OutsideRoot);
    }

    Ok(normalized)
}

/// Collapses `.` and `..` components without consulting the filesystem.
///
/// A `..` that would climb above the first component is kept, so callers can
/// detect the escape.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().collect()
}

/// The three capability roots the tool registry is allowed to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
    write_root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl Sandbox {
    /// Sandbox for a package root with the default docs write subdirectory.
    pub fn for_package(package_root: &Path) -> Result<Self, SandboxError> {
        Self::new(package_root, DOCS_WRITE_SUBDIR, &EXCLUDED_SUBPATHS)
    }

    /// `write_subdir` must be a strict relative subdirectory of `root`.
    pub fn new(root: &Path, write_subdir: &str, excluded: &[&str]) -> Result<Self, SandboxError> {
        let root = root.canonicalize().map_err(|error| {
            SandboxError::InvalidConfig(format!(
                "failed to resolve package root {}: {error}",
                root.display()
            ))
        })?;

        if Path::new(write_subdir).is_absolute() || write_subdir.trim().is_empty() {
            return Err(SandboxError::InvalidConfig(format!(
                "write subdirectory must be a non-empty relative path: {write_subdir}"
            )));
        }

        let write_root = resolve(&root, write_subdir)?;
        if write_root == root {
            return Err(SandboxError::InvalidConfig(
                "write subdirectory must differ from the package root".to_string(),
            ));
        }

        let excluded = excluded
            .iter()
            .map(|subpath| normalize(Path::new(subpath)))
            .collect();

        Ok(Self {
            root,
            write_root,
            excluded,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn write_root(&self) -> &Path {
        &self.write_root
    }

    /// Absolute path of the generated target document.
    #[must_use]
    pub fn target_document(&self) -> PathBuf {
        self.root.join(TARGET_DOCUMENT)
    }

    /// Resolves a directory to list. Excluded entries are filtered later.
    pub fn resolve_enumerate(&self, requested: &str) -> Result<PathBuf, SandboxError> {
        resolve(&self.root, requested)
    }

    pub fn resolve_read(&self, requested: &str) -> Result<PathBuf, SandboxError> {
        let resolved = resolve(&self.root, requested)?;
        if self.is_excluded(&resolved) {
            return Err(SandboxError::Excluded);
        }
        Ok(resolved)
    }

    /// Resolves against the package root, then requires the result to lie
    /// strictly inside the write subdirectory.
    ///
    /// Paths below the target document are denied: creating their parents
    /// would turn the document into a directory.
    pub fn resolve_write(&self, requested: &str) -> Result<PathBuf, SandboxError> {
        let resolved = resolve(&self.root, requested).map_err(|_| SandboxError::OutsideWriteDir)?;
        match resolved.strip_prefix(&self.write_root) {
            Ok(relative) if relative.components().next().is_some() => {}
            _ => return Err(SandboxError::OutsideWriteDir),
        }

        let target = self.target_document();
        if resolved != target && resolved.starts_with(&target) {
            return Err(SandboxError::BelowTargetDocument);
        }
        Ok(resolved)
    }

    /// Whether `path` (absolute, normalized) is at or below an excluded subpath.
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.excluded
            .iter()
            .any(|excluded| relative.starts_with(excluded))
    }
}
