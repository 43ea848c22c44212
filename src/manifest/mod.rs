//! Parser for npm package.json manifests.
//!
//! This module provides the data model for the fields packscope needs from a
//! package manifest (name, version, export map, dependencies) and functions to
//! read the manifest of an installed package out of a workspace's
//! `node_modules` tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur while reading a package manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Failed to read the manifest file from disk.
    #[error("Failed to read manifest: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the manifest JSON.
    #[error("Failed to parse manifest JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// The subset of package.json that packscope reads.
///
/// # Example
///
/// ```
/// use packscope::manifest::PackageManifest;
///
/// let json = r#"{"name": "my-lib", "version": "2.1.0"}"#;
/// let manifest: PackageManifest = serde_json::from_str(json).unwrap();
/// assert_eq!(manifest.name, Some("my-lib".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageManifest {
    /// The name of the package.
    pub name: Option<String>,

    /// The version of the package (semver format).
    pub version: Option<String>,

    /// A brief description of the package.
    pub description: Option<String>,

    /// Legacy main entry point.
    pub main: Option<String>,

    /// The declared export map, if any.
    pub exports: Option<ExportsField>,

    /// Production dependencies required at runtime.
    pub dependencies: Option<BTreeMap<String, String>>,
}

/// The `exports` field of a package.json.
///
/// npm allows several shapes here: a single string (sugar for the root
/// export), a map of subpaths to targets, or a map of conditions. packscope
/// only needs the subpath keys, so targets are kept as opaque JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportsField {
    /// Shorthand form: `"exports": "./index.js"` (root export only).
    Single(String),
    /// Map form: subpath or condition keys to targets.
    Map(BTreeMap<String, serde_json::Value>),
}

impl PackageManifest {
    /// Returns the subpath export keys declared by this package.
    ///
    /// Only dot-prefixed keys count as subpaths; condition keys like
    /// `"import"` or `"require"` at the top level mean the map describes the
    /// root export and declares no subpaths. The shorthand string form also
    /// declares no subpaths.
    pub fn subpath_exports(&self) -> Vec<String> {
        match &self.exports {
            Some(ExportsField::Map(map)) => map
                .keys()
                .filter(|key| key.starts_with('.'))
                .cloned()
                .collect(),
            Some(ExportsField::Single(_)) | None => Vec::new(),
        }
    }

    /// Returns true if the package declares any dot-prefixed subpath exports.
    pub fn has_subpath_exports(&self) -> bool {
        !self.subpath_exports().is_empty()
    }
}

/// Parses a package manifest from a JSON string.
pub fn parse_str(content: &str) -> ManifestResult<PackageManifest> {
    let manifest: PackageManifest = serde_json::from_str(content)?;
    Ok(manifest)
}

/// Parses a package manifest from a file path.
pub fn parse_file(path: &Path) -> ManifestResult<PackageManifest> {
    let content = fs::read_to_string(path)?;
    parse_str(&content)
}

/// Reads the manifest of an installed package from a workspace root.
///
/// Looks up `<root>/node_modules/<name>/package.json`. Callers treat failure
/// as non-fatal: a missing or unparsable manifest degrades to an unknown
/// version and an empty export map.
pub fn read_installed(workspace_root: &Path, package_name: &str) -> ManifestResult<PackageManifest> {
    let path = workspace_root
        .join("node_modules")
        .join(package_name)
        .join("package.json");
    parse_file(&path)
}
