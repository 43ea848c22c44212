//! Structured JSON rendering.
//!
//! Emits the full report as a machine-readable document: package metadata,
//! declared exports, resolved export specs, measurement records, and
//! composition entries verbatim, with no human formatting applied.

use std::io::{self, Write};

use serde::Serialize;

use crate::composition::CompositionEntry;
use crate::report::{MeasurementRecord, PackageInfo, Report};
use crate::resolver::ExportSpec;

/// Root JSON document.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    package: &'a PackageInfo,
    declared_exports: &'a [String],
    exports: &'a [ExportSpec],
    measurements: &'a [MeasurementRecord],
    composition: &'a [CompositionEntry],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    dependencies: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    warnings: &'a [String],
}

/// Renders the report as pretty-printed JSON.
pub fn render<W: Write>(report: &Report, writer: &mut W) -> io::Result<()> {
    let document = JsonReport {
        package: &report.package,
        declared_exports: &report.declared_exports,
        exports: &report.exports,
        measurements: report.measurements.records(),
        composition: &report.composition,
        dependencies: &report.dependencies,
        warnings: &report.warnings,
    };

    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
