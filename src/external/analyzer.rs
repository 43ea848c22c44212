//! Sourcemap analyzer adapter.
//!
//! Runs source-map-explorer over the built artifacts and parses its JSON
//! output into the [`AnalyzerReport`](crate::composition::AnalyzerReport)
//! the composition attributor consumes.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{require_success, run_tool, ToolError};
use crate::composition::AnalyzerReport;
use crate::size;

/// Sourcemap analyzer adapter running source-map-explorer through `npx`.
#[derive(Debug, Clone, Default)]
pub struct SourcemapAnalyzer;

impl SourcemapAnalyzer {
    /// Creates an analyzer adapter.
    pub fn new() -> Self {
        Self
    }

    /// Analyzes the `.js` artifacts in `dist_dir` and returns the report.
    pub async fn analyze(
        &self,
        workspace_root: &Path,
        dist_dir: &Path,
    ) -> Result<AnalyzerReport, ToolError> {
        let bundles = bundle_artifacts(dist_dir).map_err(|e| ToolError::UnexpectedOutput {
            tool: "source-map-explorer".to_string(),
            detail: e.to_string(),
        })?;
        if bundles.is_empty() {
            debug!("no bundles to analyze");
            return Ok(AnalyzerReport::default());
        }

        let mut args = vec!["source-map-explorer".to_string(), "--json".to_string()];
        args.extend(bundles.iter().map(|p| p.display().to_string()));

        let output = run_tool("npx", &args, workspace_root).await?;
        require_success("source-map-explorer", &output)?;

        AnalyzerReport::parse(&output.stdout).map_err(|e| ToolError::UnexpectedOutput {
            tool: "source-map-explorer".to_string(),
            detail: e.to_string(),
        })
    }
}

/// The `.js` bundle files in a dist directory (sourcemaps excluded).
pub fn bundle_artifacts(dist_dir: &Path) -> Result<Vec<PathBuf>, size::SizeError> {
    let mut bundles: Vec<PathBuf> = size::list_files(dist_dir)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "js"))
        .collect();
    bundles.sort();
    Ok(bundles)
}
