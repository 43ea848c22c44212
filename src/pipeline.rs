//! The measurement pipeline.
//!
//! One run owns one [`RunContext`]: the collected measurement records,
//! composition entries, warnings, and the deferred node_modules measurement
//! all live there and are passed explicitly through the stages, never held as
//! ambient state. On a fatal step failure the forward flow stops, but the
//! deferred measurement is still joined, partial results are still rendered,
//! and the workspace is still released before the error propagates.

use std::collections::HashSet;
use std::io;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::composition::Composition;
use crate::external::analyzer::{bundle_artifacts, SourcemapAnalyzer};
use crate::external::bundler::Bundler;
use crate::external::npm::{PackageInstaller, PackageManager};
use crate::manifest::{self, PackageManifest};
use crate::report::{self, MeasurementId, MeasurementRecord, PackageInfo, Report, ReportFormat};
use crate::resolver;
use crate::size::{self, Method, SizeResult};
use crate::workspace::{CleanupPolicy, Workspace};

/// Everything the operator asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The package to measure.
    pub package: String,
    /// Requested version, or the latest when absent.
    pub version: Option<String>,
    /// Custom registry URL for the install step.
    pub registry: Option<String>,
    /// Explicitly requested export paths.
    pub exports: Vec<String>,
    /// Measure gzip sizes.
    pub gzip: bool,
    /// Measure brotli sizes.
    pub brotli: bool,
    /// Keep the workspace around for inspection.
    pub preserve_workspace: bool,
    /// Allow install scripts to run.
    pub enable_scripts: bool,
    /// Select exports through an interactive prompt.
    pub interactive: bool,
    /// Emit the report as JSON instead of a table.
    pub json: bool,
}

impl RunOptions {
    /// The report format these options imply.
    pub fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            ReportFormat::Table
        }
    }

    fn cleanup_policy(&self) -> CleanupPolicy {
        if self.preserve_workspace {
            CleanupPolicy::Preserve
        } else {
            CleanupPolicy::AutoDelete
        }
    }
}

/// Interactive export selection callback.
///
/// Given the declared subpath exports, returns the subset to measure.
pub type ExportSelector = dyn Fn(&[String]) -> io::Result<Vec<String>> + Send + Sync;

/// Mutable state owned by one run and threaded through its stages.
#[derive(Default)]
pub struct RunContext {
    /// The report being assembled.
    pub report: Report,
    deferred_node_modules: Option<JoinHandle<SizeResult<(u64, u64)>>>,
}

impl RunContext {
    fn new(options: &RunOptions) -> Self {
        Self {
            report: Report {
                package: PackageInfo {
                    name: options.package.clone(),
                    requested_version: options.version.clone(),
                    installed_version: None,
                },
                ..Default::default()
            },
            deferred_node_modules: None,
        }
    }

    /// Joins the deferred node_modules measurement into the report.
    async fn finish_deferred(&mut self) -> anyhow::Result<()> {
        let Some(handle) = self.deferred_node_modules.take() else {
            return Ok(());
        };
        let (bytes, files) = handle
            .await
            .context("node_modules measurement task failed")?
            .context("node_modules measurement failed")?;
        self.report
            .measurements
            .add(MeasurementRecord::new(MeasurementId::NodeModulesSize, bytes));
        self.report
            .measurements
            .add(MeasurementRecord::new(MeasurementId::NodeModulesFiles, files));
        Ok(())
    }
}

/// Checks option combinations and export requests before anything runs.
///
/// Both failure modes here pre-empt workspace creation: the configuration
/// conflict between structured output and an interactive prompt, and any
/// malformed export request (all violations reported together).
pub fn preflight(options: &RunOptions) -> anyhow::Result<()> {
    if options.json && options.interactive {
        anyhow::bail!("--json and --interactive are mutually exclusive");
    }
    if let Err(errors) = resolver::validate(&options.exports) {
        let mut message = String::from("invalid export request(s):");
        for error in &errors {
            message.push_str(&format!("\n  {}", error));
        }
        anyhow::bail!(message);
    }
    Ok(())
}

/// Runs the full measurement pipeline.
///
/// The workspace is acquired after preflight and released exactly once at
/// the end, regardless of how the run went; whatever results were collected
/// by the time of a failure are still rendered.
pub async fn run(options: &RunOptions, selector: Option<&ExportSelector>) -> anyhow::Result<()> {
    preflight(options)?;

    let npm = PackageManager::new(options.registry.clone(), options.enable_scripts);
    run_measurement(options, selector, &npm, &mut io::stdout()).await
}

/// Workspace-owning half of [`run`], parameterized over the installer and the
/// report sink.
async fn run_measurement<W: io::Write>(
    options: &RunOptions,
    selector: Option<&ExportSelector>,
    installer: &dyn PackageInstaller,
    out: &mut W,
) -> anyhow::Result<()> {
    let workspace = Workspace::acquire(options.cleanup_policy())
        .context("failed to create temporary workspace")?;
    let mut ctx = RunContext::new(options);

    let outcome = execute(options, selector, installer, &workspace, &mut ctx).await;
    let deferred = ctx.finish_deferred().await;

    if let Err(e) = report::render(options.report_format(), &ctx.report, out) {
        warn!(error = %e, "failed to render report");
    }

    workspace.release().context("failed to release workspace")?;
    outcome.and(deferred)
}

/// The forward flow of the pipeline; fatal errors short-circuit here.
async fn execute(
    options: &RunOptions,
    selector: Option<&ExportSelector>,
    installer: &dyn PackageInstaller,
    workspace: &Workspace,
    ctx: &mut RunContext,
) -> anyhow::Result<()> {
    installer
        .install(
            workspace.root(),
            &options.package,
            options.version.as_deref(),
        )
        .await
        .context("package install failed")?;

    // Deferred: starts now, joined only at report time.
    let node_modules = workspace.node_modules_dir();
    ctx.deferred_node_modules = Some(tokio::task::spawn_blocking(move || {
        let files = size::list_files(&node_modules)?;
        let bytes = size::size_of(&files)?;
        Ok((bytes, files.len() as u64))
    }));

    // Non-fatal: a missing or broken manifest degrades to unknown version
    // and an empty export map.
    let manifest = match manifest::read_installed(workspace.root(), &options.package) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!(error = %e, "could not read installed manifest");
            ctx.report
                .warnings
                .push(format!("could not read installed manifest: {}", e));
            PackageManifest::default()
        }
    };
    ctx.report.package.installed_version = manifest.version.clone();
    if let Some(warning) =
        version_mismatch_warning(options.version.as_deref(), manifest.version.as_deref())
    {
        warn!("{}", warning);
        ctx.report.warnings.push(warning);
    }
    ctx.report.declared_exports = manifest.subpath_exports();

    let selected = match selector {
        Some(prompt) => prompt(&ctx.report.declared_exports)
            .context("interactive export selection failed")?,
        None => resolver::select_exports(&ctx.report.declared_exports, &options.exports),
    };
    let mut specs = resolver::resolve(&options.package, &selected);
    if specs.is_empty() {
        anyhow::bail!("no exports selected for {}", options.package);
    }

    let bundler = Bundler::new(workspace.root());
    resolver::detect_default_exports(&mut specs, &bundler)
        .await
        .context("default-export probe failed")?;
    resolver::write_entry_files(&workspace.src_dir(), &specs)
        .context("failed to write entry files")?;
    ctx.report.exports = specs.clone();

    info!(exports = specs.len(), "building bundle");
    let build = bundler.build(&specs).await.context("bundle build failed")?;
    ctx.report.warnings.extend(build.warnings);
    ctx.report.dependencies = build.dependencies;

    let bundles =
        bundle_artifacts(&workspace.dist_dir()).context("failed to list built artifacts")?;
    let mut methods = HashSet::from([Method::None]);
    if options.gzip {
        methods.insert(Method::Gzip);
    }
    if options.brotli {
        methods.insert(Method::Brotli);
    }
    let sizes = size::compressed_size_of(&bundles, &methods)
        .await
        .context("failed to measure built artifacts")?;
    ctx.report
        .measurements
        .add(MeasurementRecord::new(MeasurementId::SizeMinified, sizes.raw));
    if let Some(gzip) = sizes.gzip {
        ctx.report.measurements.add(MeasurementRecord::new(
            MeasurementId::SizeMinifiedGzipped,
            gzip,
        ));
    }
    if let Some(brotli) = sizes.brotli {
        ctx.report.measurements.add(MeasurementRecord::new(
            MeasurementId::SizeMinifiedBrotli,
            brotli,
        ));
    }

    let analysis = SourcemapAnalyzer::new()
        .analyze(workspace.root(), &workspace.dist_dir())
        .await
        .context("sourcemap analysis failed")?;
    let mut composition = Composition::new();
    composition.attribute(&analysis.file_sizes());
    ctx.report.composition = composition.sorted_entries();

    Ok(())
}

/// Warning text when the installed version differs from the requested one.
///
/// The discrepancy is reported but never fatal: the run continues against
/// the version that actually got installed.
fn version_mismatch_warning(requested: Option<&str>, installed: Option<&str>) -> Option<String> {
    match (requested, installed) {
        (Some(requested), Some(installed)) if requested != installed => Some(format!(
            "installed version {} differs from requested {}",
            installed, requested
        )),
        _ => None,
    }
}
