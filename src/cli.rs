//! Command line surface.
//!
//! Flag parsing, logging setup, and the interactive export selection prompt.
//! Everything measurement-related lives in [`crate::pipeline`]; this module
//! only translates the operator's intent into [`RunOptions`].

use std::io::{self, BufRead, Write};

use clap::Parser;

use crate::pipeline::RunOptions;

/// Measure the installed and bundled footprint of a published npm package.
#[derive(Debug, Parser)]
#[command(name = "packscope")]
#[command(version)]
#[command(
    about = "Measure the installed and bundled footprint of published npm packages",
    long_about = None
)]
pub struct Cli {
    /// Package name to measure.
    pub package: String,

    /// Package version (defaults to the latest).
    #[arg(id = "package_version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Custom npm registry URL.
    #[arg(long)]
    pub registry: Option<String>,

    /// Subpath export to measure (repeatable; defaults to all declared).
    #[arg(short, long = "export")]
    pub exports: Vec<String>,

    /// Skip the gzip size measurement.
    #[arg(long)]
    pub no_gzip: bool,

    /// Also measure brotli sizes.
    #[arg(long)]
    pub brotli: bool,

    /// Keep the temporary workspace for inspection.
    #[arg(long)]
    pub no_cleanup: bool,

    /// Allow install scripts to run.
    #[arg(long)]
    pub enable_scripts: bool,

    /// Pick exports interactively from the declared list.
    #[arg(short, long)]
    pub interactive: bool,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Converts parsed flags into pipeline options.
    pub fn into_options(self) -> RunOptions {
        RunOptions {
            package: self.package,
            version: self.version,
            registry: self.registry,
            exports: self.exports,
            gzip: !self.no_gzip,
            brotli: self.brotli,
            preserve_workspace: self.no_cleanup,
            enable_scripts: self.enable_scripts,
            interactive: self.interactive,
            json: self.json,
        }
    }
}

/// Initializes tracing with an env-filter; `--verbose` lowers it to debug.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "packscope=debug" } else { "packscope=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Prompts the operator to pick exports from the declared list.
///
/// Requires a live terminal; the pipeline guarantees this never runs
/// together with JSON output.
pub fn prompt_export_selection(declared: &[String]) -> io::Result<Vec<String>> {
    select_from_input(declared, &mut io::stdin().lock(), &mut io::stderr())
}

/// Prompt core, split out so tests can drive it with buffers.
fn select_from_input<R: BufRead, W: Write>(
    declared: &[String],
    input: &mut R,
    output: &mut W,
) -> io::Result<Vec<String>> {
    if declared.is_empty() {
        return Ok(vec![".".to_string()]);
    }

    writeln!(output, "Declared exports:")?;
    for (i, export) in declared.iter().enumerate() {
        writeln!(output, "  [{}] {}", i + 1, export)?;
    }
    write!(
        output,
        "Select exports (comma-separated numbers, empty for all): "
    )?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(declared.to_vec());
    }

    let mut selected = Vec::new();
    for token in line.split(',') {
        let token = token.trim();
        match token.parse::<usize>() {
            Ok(n) if n >= 1 && n <= declared.len() => {
                let export = declared[n - 1].clone();
                if !selected.contains(&export) {
                    selected.push(export);
                }
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid selection '{}'", token),
                ));
            }
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_into_options_flag_mapping() {
        let cli = Cli::parse_from([
            "packscope",
            "lodash",
            "4.17.21",
            "--export",
            "./fp",
            "--no-gzip",
            "--brotli",
            "--no-cleanup",
            "--json",
        ]);
        let options = cli.into_options();

        assert_eq!(options.package, "lodash");
        assert_eq!(options.version.as_deref(), Some("4.17.21"));
        assert_eq!(options.exports, vec!["./fp".to_string()]);
        assert!(!options.gzip);
        assert!(options.brotli);
        assert!(options.preserve_workspace);
        assert!(options.json);
        assert!(!options.interactive);
    }

    #[test]
    fn test_into_options_defaults() {
        let options = Cli::parse_from(["packscope", "dayjs"]).into_options();

        assert!(options.gzip);
        assert!(!options.brotli);
        assert!(!options.preserve_workspace);
        assert!(!options.enable_scripts);
        assert!(options.version.is_none());
        assert!(options.exports.is_empty());
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_from_input_numbers() {
        let declared = strings(&[".", "./utils", "./extra"]);
        let mut input = io::Cursor::new("1, 3\n");
        let mut output = Vec::new();

        let selected = select_from_input(&declared, &mut input, &mut output).unwrap();
        assert_eq!(selected, strings(&[".", "./extra"]));

        let prompt = String::from_utf8(output).unwrap();
        assert!(prompt.contains("[1] ."));
        assert!(prompt.contains("[3] ./extra"));
    }

    #[test]
    fn test_select_from_input_empty_selects_all() {
        let declared = strings(&[".", "./utils"]);
        let mut input = io::Cursor::new("\n");
        let mut output = Vec::new();

        let selected = select_from_input(&declared, &mut input, &mut output).unwrap();
        assert_eq!(selected, declared);
    }

    #[test]
    fn test_select_from_input_invalid_token() {
        let declared = strings(&["."]);
        let mut input = io::Cursor::new("nope\n");
        let mut output = Vec::new();

        assert!(select_from_input(&declared, &mut input, &mut output).is_err());
    }

    #[test]
    fn test_select_from_input_out_of_range() {
        let declared = strings(&["."]);
        let mut input = io::Cursor::new("2\n");
        let mut output = Vec::new();

        assert!(select_from_input(&declared, &mut input, &mut output).is_err());
    }

    #[test]
    fn test_select_from_input_no_declared_exports_defaults_to_root() {
        let mut input = io::Cursor::new("");
        let mut output = Vec::new();

        let selected = select_from_input(&[], &mut input, &mut output).unwrap();
        assert_eq!(selected, strings(&["."]));
        // Nothing to choose from, so no prompt either.
        assert!(output.is_empty());
    }
}
