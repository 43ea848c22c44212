//! Adapters for the external tools packscope drives.
//!
//! The package manager (npm), the bundler (rollup), and the sourcemap
//! analyzer (source-map-explorer) all run as child processes inside the
//! workspace. Every invocation is attempted exactly once; a non-zero exit
//! from a required step surfaces as a [`ToolError`] carrying the tool's
//! diagnostic output, and transient failures go straight to the operator.

pub mod analyzer;
pub mod bundler;
pub mod npm;

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Errors from external tool invocations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool could not be launched at all.
    #[error("Failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool exited non-zero.
    #[error("{tool} failed (exit {code:?}):\n{stderr}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool exited cleanly but its output was not what the adapter expects.
    #[error("{tool} produced unexpected output: {detail}")]
    UnexpectedOutput { tool: String, detail: String },

    /// Preparing the tool's inputs in the workspace failed.
    #[error("Failed to prepare workspace input for {tool}: {source}")]
    Prepare {
        tool: String,
        #[source]
        source: io::Error,
    },
}

/// Captured output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ToolOutput {
    /// Returns true if the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a tool to completion in the given working directory.
///
/// Output streams are captured, not inherited; callers inspect stderr for
/// the diagnostic substrings the pipeline uses as control signals.
pub async fn run_tool(program: &str, args: &[String], cwd: &Path) -> Result<ToolOutput, ToolError> {
    debug!(program, ?args, cwd = %cwd.display(), "running external tool");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ToolError::Launch {
            tool: program.to_string(),
            source,
        })?;

    Ok(ToolOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Converts a non-success [`ToolOutput`] into a [`ToolError::Failed`].
pub fn require_success(tool: &str, output: &ToolOutput) -> Result<(), ToolError> {
    if output.success() {
        Ok(())
    } else {
        Err(ToolError::Failed {
            tool: tool.to_string(),
            code: output.code,
            stderr: output.stderr.clone(),
        })
    }
}
