use std::path::{Path, PathBuf};

use tracing::warn;

use crate::package::{ManifestError, PackageManifest};

const INITIAL_TEMPLATE: &str = include_str!("../prompts/initial.txt");
const REVISION_TEMPLATE: &str = include_str!("../prompts/revision.txt");
const SECTION_BASED_TEMPLATE: &str = include_str!("../prompts/section_based.txt");

pub const ERROR_RETRY_INSTRUCTION: &str = "The previous attempt encountered an error. Please try a different approach to analyze the package and create/update the documentation.";
pub const UNCHANGED_RETRY_INSTRUCTION: &str = "You haven't written a README.md file yet. Please write the README.md file in the _dev/build/docs/ directory based on your analysis.";
pub const FORCED_WRITE_INSTRUCTION: &str = "You haven't updated a README.md file yet. Please create the README.md file in the _dev/build/docs/ directory based on your analysis. This is required to complete the task.";

/// Source of prompt text bodies for the session controller.
pub trait PromptSource {
    fn initial(&self) -> String;
    /// Full-context revision prompt wrapping `changes`.
    fn revision(&self, changes: &str) -> String;
    /// Length-limit recovery prompt asking for incremental writes.
    fn section_based(&self) -> String;
}

/// Template-backed prompts for one package.
///
/// The manifest is read once up front; revision prompts re-read it so that
/// edits made during the session are picked up.
#[derive(Debug, Clone)]
pub struct PackagePrompts {
    package_root: PathBuf,
    manifest: PackageManifest,
}

impl PackagePrompts {
    pub fn load(package_root: &Path) -> Result<Self, ManifestError> {
        let manifest = PackageManifest::from_package_root(package_root)?;
        Ok(Self::with_manifest(package_root, manifest))
    }

    pub fn with_manifest(package_root: &Path, manifest: PackageManifest) -> Self {
        Self {
            package_root: package_root.to_path_buf(),
            manifest,
        }
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }
}

impl PromptSource for PackagePrompts {
    fn initial(&self) -> String {
        render(INITIAL_TEMPLATE, &self.manifest, None)
    }

    fn revision(&self, changes: &str) -> String {
        match PackageManifest::from_package_root(&self.package_root) {
            Ok(manifest) => render(REVISION_TEMPLATE, &manifest, Some(changes)),
            Err(error) => {
                warn!(%error, "falling back to plain revision prompt");
                format!("Please make the following changes to the documentation:\n\n{changes}")
            }
        }
    }

    fn section_based(&self) -> String {
        render(SECTION_BASED_TEMPLATE, &self.manifest, None)
    }
}

/// Single-pass `{placeholder}` substitution; substituted text is not rescanned
/// and unknown placeholders are left as written.
fn render(template: &str, manifest: &PackageManifest, changes: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len() + changes.map_or(0, str::len));
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after[..close];
        let value = match key {
            "name" => Some(manifest.name.as_str()),
            "title" => Some(manifest.title.as_str()),
            "type" => Some(manifest.package_type.as_str()),
            "version" => Some(manifest.version.as_str()),
            "description" => Some(manifest.description.as_str()),
            "changes" => changes,
            _ => None,
        };

        match value {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}
