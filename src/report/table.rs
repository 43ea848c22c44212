//! Human-readable table rendering.
//!
//! Prints measurements as aligned caption/value columns, followed by the
//! composition breakdown. Byte values get a short binary-unit form with the
//! exact count parenthesized once they reach 1 KiB; counts render bare.

use std::io::{self, Write};

use crate::composition::SELF_MARKER;
use crate::report::{format_size, Report, Unit};

/// Renders a size cell: short form plus exact bytes when >= 1 KiB.
fn size_cell(bytes: u64) -> String {
    if bytes >= 1024 {
        format!("{} ({} bytes)", format_size(bytes), bytes)
    } else {
        format_size(bytes)
    }
}

/// Renders the full report as a table.
pub fn render<W: Write>(report: &Report, writer: &mut W) -> io::Result<()> {
    let title = match &report.package.installed_version {
        Some(version) => format!("{}@{}", report.package.name, version),
        None => report.package.name.clone(),
    };
    writeln!(writer, "{}", title)?;

    for warning in &report.warnings {
        writeln!(writer, "warning: {}", warning)?;
    }

    if !report.exports.is_empty() {
        let paths: Vec<&str> = report
            .exports
            .iter()
            .map(|e| e.export_path.as_str())
            .collect();
        writeln!(writer, "exports: {}", paths.join(", "))?;
    }

    if !report.measurements.is_empty() {
        writeln!(writer)?;
        let width = report
            .measurements
            .records()
            .iter()
            .map(|r| r.id.caption().len())
            .max()
            .unwrap_or(0);
        for record in report.measurements.records() {
            let value = match record.unit {
                Unit::Bytes => size_cell(record.value),
                Unit::Count => record.value.to_string(),
            };
            writeln!(writer, "  {:<width$}  {}", record.id.caption(), value)?;
        }
    }

    if !report.composition.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "composition:")?;
        let width = report
            .composition
            .iter()
            .map(|e| display_package(&e.package, &report.package.name).len())
            .max()
            .unwrap_or(0);
        for entry in &report.composition {
            let name = display_package(&entry.package, &report.package.name);
            writeln!(writer, "  {:<width$}  {}", name, size_cell(entry.size))?;
        }
    }

    Ok(())
}

/// Substitutes the measured package's name for the self marker.
fn display_package(key: &str, package_name: &str) -> String {
    if key == SELF_MARKER {
        format!("{} (self)", package_name)
    } else {
        key.to_string()
    }
}
