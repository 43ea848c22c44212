//! Sourcemap-driven bundle composition attribution.
//!
//! The external sourcemap analyzer reports, per bundle, how many bytes each
//! original source file contributed. This module parses that report and
//! attributes those bytes back to the npm package each source file belongs
//! to, with everything outside `node_modules` credited to the measured
//! package itself.
//!
//! Attribution is advisory: it depends on the analyzer's path conventions and
//! sourcemap coverage may be partial, so missing entries are silently
//! excluded rather than treated as an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Marker key for bytes attributed to the measured package itself.
pub const SELF_MARKER: &str = "(self)";

/// Synthetic end-of-lines entry some analyzers emit for unmapped trailing
/// bytes. Never attributed to a package.
const EOL_SENTINEL: &str = "[EOLs]";

/// Top-level JSON document emitted by the sourcemap analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzerReport {
    /// One result per analyzed bundle.
    #[serde(default)]
    pub results: Vec<AnalyzerResult>,
}

/// Per-bundle analysis result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerResult {
    /// The analyzed bundle file.
    pub bundle_name: Option<String>,

    /// Source path to contributed size, as mapped through the sourcemap.
    #[serde(default)]
    pub files: HashMap<String, FileSize>,
}

/// Size record for one source file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct FileSize {
    /// Bytes in the bundle attributed to this source file.
    #[serde(default)]
    pub size: u64,
}

impl AnalyzerReport {
    /// Parses an analyzer report from its JSON output.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Flattens all per-bundle file maps into one source path → size map.
    ///
    /// The same source path appearing in several bundles sums.
    pub fn file_sizes(&self) -> HashMap<String, u64> {
        let mut sizes: HashMap<String, u64> = HashMap::new();
        for result in &self.results {
            for (path, file) in &result.files {
                *sizes.entry(path.clone()).or_insert(0) += file.size;
            }
        }
        sizes
    }
}

/// One package's cumulative attributed byte count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionEntry {
    /// Package name, or [`SELF_MARKER`] for the measured package.
    pub package: String,

    /// Total bytes attributed to this package.
    pub size: u64,
}

/// Accumulated per-package byte attribution.
///
/// Keys are unique; accumulation is additive, so attributing the same map
/// twice doubles every entry and merging is commutative.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    entries: HashMap<String, u64>,
}

impl Composition {
    /// Creates an empty composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes a source path → size map into this composition.
    ///
    /// Paths under `node_modules` credit the owning package; everything else
    /// credits the self marker. The analyzer's end-of-lines sentinel and
    /// zero-size entries are dropped, not zeroed.
    pub fn attribute(&mut self, file_sizes: &HashMap<String, u64>) {
        for (path, &size) in file_sizes {
            if size == 0 || path == EOL_SENTINEL {
                continue;
            }
            let key = extract_package_name(path).unwrap_or_else(|| SELF_MARKER.to_string());
            *self.entries.entry(key).or_insert(0) += size;
        }
    }

    /// Total attributed bytes across all packages.
    pub fn total(&self) -> u64 {
        self.entries.values().sum()
    }

    /// Returns true if nothing has been attributed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in render order: self first, then descending by size.
    pub fn sorted_entries(&self) -> Vec<CompositionEntry> {
        let mut entries: Vec<CompositionEntry> = self
            .entries
            .iter()
            .map(|(package, &size)| CompositionEntry {
                package: package.clone(),
                size,
            })
            .collect();
        entries.sort_by(|a, b| {
            let a_self = a.package == SELF_MARKER;
            let b_self = b.package == SELF_MARKER;
            b_self
                .cmp(&a_self)
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.package.cmp(&b.package))
        });
        entries
    }
}

/// Extracts the owning npm package name from a source path.
///
/// Handles the analyzer's relative and absolute path forms:
/// - `../node_modules/lodash/lodash.js` -> `lodash`
/// - `../node_modules/@scope/pkg/file.js` -> `@scope/pkg`
/// - `webpack://app/src/index.js` -> `None` (not vendored)
///
/// The innermost `node_modules` segment wins for nested installs.
pub fn extract_package_name(source_path: &str) -> Option<String> {
    let marker = "node_modules/";
    let pos = source_path.rfind(marker)?;
    let after = &source_path[pos + marker.len()..];
    let segments: Vec<&str> = after.split('/').collect();

    match segments.first() {
        Some(first) if first.starts_with('@') => {
            // Scoped package: first two segments joined.
            segments
                .get(1)
                .map(|second| format!("{}/{}", first, second))
        }
        Some(first) if !first.is_empty() => Some(first.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sizes() -> HashMap<String, u64> {
        HashMap::from([
            ("../node_modules/lodash/lodash.js".to_string(), 2000),
            ("../node_modules/lodash/fp.js".to_string(), 500),
            ("../node_modules/@scope/pkg/file.js".to_string(), 1000),
            ("src/index.js".to_string(), 300),
            ("[EOLs]".to_string(), 40),
            ("../node_modules/empty/zero.js".to_string(), 0),
        ])
    }

    #[test]
    fn test_extract_package_name_regular() {
        assert_eq!(
            extract_package_name("../node_modules/lodash/lodash.js"),
            Some("lodash".to_string())
        );
        assert_eq!(
            extract_package_name("/abs/path/node_modules/react/index.js"),
            Some("react".to_string())
        );
    }

    #[test]
    fn test_extract_package_name_scoped() {
        assert_eq!(
            extract_package_name("../node_modules/@scope/pkg/file.js"),
            Some("@scope/pkg".to_string())
        );
    }

    #[test]
    fn test_extract_package_name_nested_node_modules() {
        assert_eq!(
            extract_package_name("node_modules/a/node_modules/b/index.js"),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_extract_package_name_outside_node_modules() {
        assert_eq!(extract_package_name("src/index.js"), None);
        assert_eq!(extract_package_name("webpack://app/main.js"), None);
    }

    #[test]
    fn test_attribute_aggregates_per_package() {
        let mut composition = Composition::new();
        composition.attribute(&sample_sizes());

        let entries = composition.sorted_entries();
        let lodash = entries.iter().find(|e| e.package == "lodash").unwrap();
        assert_eq!(lodash.size, 2500);

        let scoped = entries.iter().find(|e| e.package == "@scope/pkg").unwrap();
        assert_eq!(scoped.size, 1000);
    }

    #[test]
    fn test_attribute_self_marker_for_local_sources() {
        let mut composition = Composition::new();
        composition.attribute(&sample_sizes());

        let entries = composition.sorted_entries();
        let own = entries.iter().find(|e| e.package == SELF_MARKER).unwrap();
        assert_eq!(own.size, 300);
    }

    #[test]
    fn test_attribute_drops_sentinel_and_zero_entries() {
        let mut composition = Composition::new();
        composition.attribute(&sample_sizes());

        let entries = composition.sorted_entries();
        assert!(entries.iter().all(|e| e.package != EOL_SENTINEL));
        assert!(entries.iter().all(|e| e.package != "empty"));
        assert_eq!(composition.total(), 3800);
    }

    #[test]
    fn test_attribute_idempotent_totals_under_reaggregation() {
        let sizes = sample_sizes();

        let mut once = Composition::new();
        once.attribute(&sizes);

        let mut twice = Composition::new();
        twice.attribute(&sizes);
        twice.attribute(&sizes);

        assert_eq!(twice.total(), once.total() * 2);
        for entry in once.sorted_entries() {
            let doubled = twice
                .sorted_entries()
                .into_iter()
                .find(|e| e.package == entry.package)
                .unwrap();
            assert_eq!(doubled.size, entry.size * 2);
        }
    }

    #[test]
    fn test_sorted_entries_self_first_then_descending() {
        let mut composition = Composition::new();
        composition.attribute(&sample_sizes());

        let entries = composition.sorted_entries();
        assert_eq!(entries[0].package, SELF_MARKER);
        assert_eq!(entries[1].package, "lodash");
        assert_eq!(entries[2].package, "@scope/pkg");
    }

    #[test]
    fn test_parse_analyzer_report() {
        let json = r#"{
            "results": [
                {
                    "bundleName": "dist/index.js",
                    "files": {
                        "../node_modules/lodash/lodash.js": { "size": 1200 },
                        "src/index.js": { "size": 100 }
                    }
                },
                {
                    "bundleName": "dist/utils.js",
                    "files": {
                        "../node_modules/lodash/lodash.js": { "size": 800 }
                    }
                }
            ]
        }"#;

        let report = AnalyzerReport::parse(json).unwrap();
        assert_eq!(report.results.len(), 2);

        let sizes = report.file_sizes();
        assert_eq!(sizes["../node_modules/lodash/lodash.js"], 2000);
        assert_eq!(sizes["src/index.js"], 100);
    }

    #[test]
    fn test_parse_empty_report() {
        let report = AnalyzerReport::parse("{}").unwrap();
        assert!(report.results.is_empty());
        assert!(report.file_sizes().is_empty());
    }
}
