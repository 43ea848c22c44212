//! Subpath export resolution and re-export entry generation.
//!
//! This module validates the export paths a user asked for, intersects them
//! with what the installed package actually declares, and turns each
//! selection into an [`ExportSpec`]: the import specifier to bundle plus
//! whether that specifier carries a default export. It also writes the
//! synthetic re-export source files the bundler consumes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Errors for malformed export requests.
///
/// Validation collects every violation instead of stopping at the first, so
/// the operator sees all problems in one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An export request that does not start with `.`.
    #[error("Export '{0}' must start with '.'")]
    NotDotPrefixed(String),

    /// An export request containing a wildcard segment.
    #[error("Export '{0}' must not contain a wildcard ('*')")]
    Wildcard(String),
}

/// A validated, resolved subpath export ready to bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpec {
    /// The export path as declared in the manifest (`.` or `./<subpath>`).
    pub export_path: String,

    /// The specifier used to import it (`<name>` or `<name>/<subpath>`).
    pub import_specifier: String,

    /// Whether importing the specifier yields a default export.
    pub has_default_export: bool,
}

/// Capability check for default exports.
///
/// How the answer is produced (a probe build, static analysis) is an
/// implementation detail behind this trait; the resolver only needs the bool.
#[async_trait]
pub trait DefaultExportProbe {
    /// Returns true if importing `specifier` yields a default export.
    async fn import_has_default(&self, specifier: &str) -> anyhow::Result<bool>;
}

/// Validates the user-requested export paths.
///
/// Each path must be dot-prefixed and wildcard-free. All violations are
/// collected and returned together; any violation aborts the run before a
/// workspace is created.
pub fn validate(requested: &[String]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    for export in requested {
        if !export.starts_with('.') {
            errors.push(ValidationError::NotDotPrefixed(export.clone()));
        }
        if export.contains('*') {
            errors.push(ValidationError::Wildcard(export.clone()));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Intersects the requested exports with what the package declares.
///
/// With no explicit request, every declared subpath export is selected, or
/// the bare root when the package declares none. An explicit root request is
/// honored even for packages with zero declared subpath exports. The result
/// is normalized: repeated requests collapse to their first occurrence, so
/// each export resolves (and probes, and bundles) exactly once.
pub fn select_exports(declared: &[String], requested: &[String]) -> Vec<String> {
    let candidates: Vec<String> = if requested.is_empty() {
        if declared.is_empty() {
            vec![".".to_string()]
        } else {
            declared.to_vec()
        }
    } else {
        requested
            .iter()
            .filter(|r| declared.contains(r) || r.as_str() == ".")
            .cloned()
            .collect()
    };

    let mut selected = Vec::with_capacity(candidates.len());
    for export in candidates {
        if !selected.contains(&export) {
            selected.push(export);
        }
    }
    selected
}

/// Resolves selected export paths into [`ExportSpec`]s for a package.
///
/// The root export maps to the bare package name; `./<subpath>` maps to
/// `<name>/<subpath>`. Entries not in dot-prefixed form are dropped silently
/// (validation already reported them). Default-export detection is deferred
/// to [`detect_default_exports`]; specs start out without one.
pub fn resolve(package_name: &str, selected: &[String]) -> Vec<ExportSpec> {
    selected
        .iter()
        .filter(|path| path.starts_with('.'))
        .map(|path| {
            let import_specifier = match path.strip_prefix("./") {
                Some(subpath) => format!("{}/{}", package_name, subpath),
                None => package_name.to_string(),
            };
            ExportSpec {
                export_path: path.clone(),
                import_specifier,
                has_default_export: false,
            }
        })
        .collect()
}

/// Fills in `has_default_export` for each spec via the given probe.
///
/// One probe invocation per spec; this is an O(exports) cost accepted for
/// correctness over speed.
pub async fn detect_default_exports(
    specs: &mut [ExportSpec],
    probe: &dyn DefaultExportProbe,
) -> anyhow::Result<()> {
    for spec in specs.iter_mut() {
        spec.has_default_export = probe.import_has_default(&spec.import_specifier).await?;
        debug!(
            specifier = %spec.import_specifier,
            has_default = spec.has_default_export,
            "default export probed"
        );
    }
    Ok(())
}

/// The entry file name for an export path (`.` becomes `index.js`).
pub fn entry_file_name(export_path: &str) -> String {
    match export_path.strip_prefix("./") {
        Some(subpath) => format!("{}.js", subpath.replace('/', "_")),
        None => "index.js".to_string(),
    }
}

/// Writes one re-export entry file per spec into the workspace source dir.
///
/// Each file re-exports everything from the import specifier, plus the
/// default export when the spec has one, so the bundler pulls in the full
/// public surface of the export.
pub fn write_entry_files(src_dir: &Path, specs: &[ExportSpec]) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::with_capacity(specs.len());
    for spec in specs {
        let path = src_dir.join(entry_file_name(&spec.export_path));
        let mut content = format!("export * from {:?};\n", spec.import_specifier);
        if spec.has_default_export {
            content.push_str(&format!(
                "export {{ default }} from {:?};\n",
                spec.import_specifier
            ));
        }
        fs::write(&path, content)?;
        entries.push(path);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(bool);

    #[async_trait]
    impl DefaultExportProbe for FixedProbe {
        async fn import_has_default(&self, _specifier: &str) -> anyhow::Result<bool> {
            Ok(self.0)
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_accepts_dot_prefixed() {
        assert!(validate(&strings(&[".", "./utils", "./deep/path"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_wildcard() {
        let errors = validate(&strings(&["./icons/*"])).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Wildcard("./icons/*".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_missing_dot_prefix() {
        let errors = validate(&strings(&["utils"])).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::NotDotPrefixed("utils".to_string())]
        );
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let errors = validate(&strings(&["utils", "./icons/*", "*"])).unwrap_err();

        // "*" violates both rules; nothing short-circuits.
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::NotDotPrefixed("utils".to_string())));
        assert!(errors.contains(&ValidationError::Wildcard("*".to_string())));
        assert!(errors.contains(&ValidationError::NotDotPrefixed("*".to_string())));
    }

    #[test]
    fn test_select_defaults_to_declared() {
        let declared = strings(&[".", "./utils"]);
        assert_eq!(select_exports(&declared, &[]), declared);
    }

    #[test]
    fn test_select_root_when_nothing_declared() {
        assert_eq!(select_exports(&[], &[]), strings(&["."]));
    }

    #[test]
    fn test_select_root_request_without_declared_exports() {
        // A package with zero subpath exports still honors an explicit root.
        assert_eq!(select_exports(&[], &strings(&["."])), strings(&["."]));
    }

    #[test]
    fn test_select_intersects_with_declared() {
        let declared = strings(&[".", "./utils"]);
        let requested = strings(&["./utils", "./missing"]);

        assert_eq!(select_exports(&declared, &requested), strings(&["./utils"]));
    }

    #[test]
    fn test_select_deduplicates_repeated_requests() {
        let declared = strings(&[".", "./utils"]);
        let requested = strings(&[".", ".", "./utils", "."]);

        // First occurrence wins; order is preserved.
        assert_eq!(
            select_exports(&declared, &requested),
            strings(&[".", "./utils"])
        );
    }

    #[test]
    fn test_duplicate_root_requests_resolve_to_one_spec() {
        let declared = strings(&[".", "./utils"]);
        let selected = select_exports(&declared, &strings(&[".", ".", "./utils"]));
        let specs = resolve("my-lib", &selected);

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].export_path, ".");
        assert_eq!(specs[1].export_path, "./utils");
    }

    #[test]
    fn test_resolve_root_export() {
        let specs = resolve("my-lib", &strings(&["."]));

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].export_path, ".");
        assert_eq!(specs[0].import_specifier, "my-lib");
        assert!(!specs[0].has_default_export);
    }

    #[test]
    fn test_resolve_subpath_export() {
        let specs = resolve("my-lib", &strings(&["./utils/deep"]));

        assert_eq!(specs[0].import_specifier, "my-lib/utils/deep");
    }

    #[test]
    fn test_resolve_scoped_package() {
        let specs = resolve("@scope/pkg", &strings(&[".", "./extra"]));

        assert_eq!(specs[0].import_specifier, "@scope/pkg");
        assert_eq!(specs[1].import_specifier, "@scope/pkg/extra");
    }

    #[test]
    fn test_resolve_drops_non_dot_entries_silently() {
        let specs = resolve("my-lib", &strings(&["utils", "."]));

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].export_path, ".");
    }

    #[tokio::test]
    async fn test_detect_default_exports() {
        let mut specs = resolve("my-lib", &strings(&[".", "./utils"]));

        detect_default_exports(&mut specs, &FixedProbe(true))
            .await
            .unwrap();
        assert!(specs.iter().all(|s| s.has_default_export));

        detect_default_exports(&mut specs, &FixedProbe(false))
            .await
            .unwrap();
        assert!(specs.iter().all(|s| !s.has_default_export));
    }

    #[test]
    fn test_entry_file_name() {
        assert_eq!(entry_file_name("."), "index.js");
        assert_eq!(entry_file_name("./utils"), "utils.js");
        assert_eq!(entry_file_name("./deep/path"), "deep_path.js");
    }

    #[test]
    fn test_write_entry_files() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![
            ExportSpec {
                export_path: ".".to_string(),
                import_specifier: "my-lib".to_string(),
                has_default_export: true,
            },
            ExportSpec {
                export_path: "./utils".to_string(),
                import_specifier: "my-lib/utils".to_string(),
                has_default_export: false,
            },
        ];

        let written = write_entry_files(dir.path(), &specs).unwrap();
        assert_eq!(written.len(), 2);

        let index = fs::read_to_string(dir.path().join("index.js")).unwrap();
        assert!(index.contains(r#"export * from "my-lib";"#));
        assert!(index.contains(r#"export { default } from "my-lib";"#));

        let utils = fs::read_to_string(dir.path().join("utils.js")).unwrap();
        assert!(utils.contains(r#"export * from "my-lib/utils";"#));
        assert!(!utils.contains("default"));
    }
}
