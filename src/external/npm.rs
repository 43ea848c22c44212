//! Package manager adapter.
//!
//! Installs exactly one dependency into the workspace: a synthetic root
//! manifest is written with the measured package as its only dependency,
//! then `npm install` runs against it. Script execution is off unless the
//! operator opted in, and a custom registry can be supplied.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{require_success, run_tool, ToolError};

/// Installs one package into a workspace.
///
/// The real implementation shells out to npm; the trait keeps the pipeline
/// testable without a package manager on the machine.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Installs `name` (at `version`, or the wildcard) into the workspace.
    async fn install(
        &self,
        workspace_root: &Path,
        name: &str,
        version: Option<&str>,
    ) -> Result<(), ToolError>;
}

/// Configuration for the package manager invocation.
#[derive(Debug, Clone, Default)]
pub struct PackageManager {
    /// Custom registry URL, if any.
    pub registry: Option<String>,
    /// Whether install scripts may run.
    pub scripts_enabled: bool,
}

impl PackageManager {
    /// Creates a package manager adapter.
    pub fn new(registry: Option<String>, scripts_enabled: bool) -> Self {
        Self {
            registry,
            scripts_enabled,
        }
    }

    /// The argument list for `npm install` under this configuration.
    pub fn install_args(&self) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            "--no-audit".to_string(),
            "--no-fund".to_string(),
        ];
        if !self.scripts_enabled {
            args.push("--ignore-scripts".to_string());
        }
        if let Some(registry) = &self.registry {
            args.push(format!("--registry={}", registry));
        }
        args
    }
}

#[async_trait]
impl PackageInstaller for PackageManager {
    async fn install(
        &self,
        workspace_root: &Path,
        name: &str,
        version: Option<&str>,
    ) -> Result<(), ToolError> {
        write_install_manifest(workspace_root, name, version).map_err(|source| {
            ToolError::Prepare {
                tool: "npm".to_string(),
                source,
            }
        })?;

        info!(package = name, version = version.unwrap_or("*"), "installing");
        let output = run_tool("npm", &self.install_args(), workspace_root).await?;
        require_success("npm", &output)
    }
}

/// Writes the synthetic workspace manifest with the package as its only
/// dependency.
pub fn write_install_manifest(
    workspace_root: &Path,
    name: &str,
    version: Option<&str>,
) -> std::io::Result<()> {
    let manifest = json!({
        "name": "packscope-workspace",
        "private": true,
        "dependencies": {
            name: version.unwrap_or("*"),
        },
    });
    let content = serde_json::to_string_pretty(&manifest)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(workspace_root.join("package.json"), content)
}
