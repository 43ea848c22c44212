//! Bundler adapter.
//!
//! Generates a rollup config over the workspace's re-export entry files and
//! runs the bundler to produce minified artifacts with sourcemaps under
//! `dist/`. Rollup's stderr is inspected for specific diagnostic substrings:
//! `"default is not exported by"` answers the default-export probe and
//! `"Generated an empty chunk"` is tolerated as a warning.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{require_success, run_tool, ToolError};
use crate::resolver::{entry_file_name, DefaultExportProbe, ExportSpec};

/// Rollup diagnostic emitted when a default import has no matching export.
pub const NO_DEFAULT_EXPORT_SIGNAL: &str = "default is not exported by";

/// Rollup diagnostic emitted when an entry produces no output.
pub const EMPTY_CHUNK_SIGNAL: &str = "Generated an empty chunk";

/// File name of the generated bundler config.
const CONFIG_FILE: &str = "rollup.config.mjs";

/// File name of the probe entry used for default-export detection.
const PROBE_FILE: &str = "__packscope_probe__.js";

/// Output of a successful bundle build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Warnings worth reporting (for example empty chunks).
    pub warnings: Vec<String>,

    /// The dependency listing the bundler emitted, when present.
    ///
    /// Bundler-version dependent; absence is not an error.
    pub dependencies: Vec<String>,
}

/// Bundler adapter running rollup through `npx`.
#[derive(Debug, Clone)]
pub struct Bundler {
    workspace_root: PathBuf,
}

impl Bundler {
    /// Creates a bundler adapter rooted at the workspace.
    pub fn new(workspace_root: &Path) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
        }
    }

    /// Builds the given export specs into `dist/`.
    pub async fn build(&self, specs: &[ExportSpec]) -> Result<BuildOutput, ToolError> {
        let config = rollup_config(specs);
        fs::write(self.workspace_root.join(CONFIG_FILE), config).map_err(|source| {
            ToolError::Prepare {
                tool: "rollup".to_string(),
                source,
            }
        })?;

        let args: Vec<String> = ["rollup", "--config", CONFIG_FILE]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = run_tool("npx", &args, &self.workspace_root).await?;

        let mut warnings = Vec::new();
        if output.stderr.contains(EMPTY_CHUNK_SIGNAL) {
            warn!("bundler generated an empty chunk");
            warnings.push("bundler generated an empty chunk".to_string());
        }
        require_success("rollup", &output)?;

        Ok(BuildOutput {
            warnings,
            dependencies: self.read_dependency_listing(),
        })
    }

    /// Reads the bundler's dependency listing from `dist/`, if it emitted one.
    fn read_dependency_listing(&self) -> Vec<String> {
        let path = self.workspace_root.join("dist").join("dependencies.json");
        let Ok(content) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(deps) => deps,
            Err(e) => {
                debug!(error = %e, "unparsable dependency listing ignored");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DefaultExportProbe for Bundler {
    /// Probes whether `specifier` has a default export via a throwaway build.
    ///
    /// A probe entry importing the default is built on its own; the
    /// no-default diagnostic on stderr means the import would fail, any other
    /// build failure is a real tool error.
    async fn import_has_default(&self, specifier: &str) -> anyhow::Result<bool> {
        let probe_path = self.workspace_root.join("src").join(PROBE_FILE);
        fs::write(&probe_path, probe_entry(specifier)).map_err(|source| ToolError::Prepare {
            tool: "rollup".to_string(),
            source,
        })?;

        let probe_input = format!("src/{}", PROBE_FILE);
        let args: Vec<String> = [
            "rollup",
            probe_input.as_str(),
            "--silent",
            "--file",
            "dist-probe/probe.js",
            "--format",
            "esm",
            "--plugin",
            "@rollup/plugin-node-resolve",
            "--plugin",
            "@rollup/plugin-commonjs",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let output = run_tool("npx", &args, &self.workspace_root).await?;

        // Clean up the probe entry so the main build never picks it up.
        let _ = fs::remove_file(&probe_path);

        if output.stderr.contains(NO_DEFAULT_EXPORT_SIGNAL) {
            return Ok(false);
        }
        require_success("rollup", &output)?;
        Ok(true)
    }
}

/// Generates the rollup config for a set of export specs.
///
/// Each spec becomes a named input pointing at its generated entry file;
/// output goes to `dist/` as minified ESM with sourcemaps enabled for the
/// downstream analyzer.
pub fn rollup_config(specs: &[ExportSpec]) -> String {
    let inputs: Vec<String> = specs
        .iter()
        .map(|spec| {
            let file = entry_file_name(&spec.export_path);
            let name = file.trim_end_matches(".js");
            format!("    {:?}: {:?},", name, format!("src/{}", file))
        })
        .collect();

    format!(
        r#"import {{ nodeResolve }} from "@rollup/plugin-node-resolve";
import commonjs from "@rollup/plugin-commonjs";
import json from "@rollup/plugin-json";
import terser from "@rollup/plugin-terser";

export default {{
  input: {{
{inputs}
  }},
  output: {{
    dir: "dist",
    format: "esm",
    sourcemap: true,
  }},
  plugins: [nodeResolve(), commonjs(), json(), terser()],
}};
"#,
        inputs = inputs.join("\n")
    )
}

/// The probe entry source for a default-export check.
pub fn probe_entry(specifier: &str) -> String {
    format!(
        "import probed from {:?};\nexport default probed;\n",
        specifier
    )
}
