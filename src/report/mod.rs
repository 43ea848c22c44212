//! Result aggregation and rendering.
//!
//! This module collects typed measurement records plus the composition
//! breakdown into a single [`Report`] and renders it either as an aligned
//! human-readable table or as a structured JSON document.

pub mod json;
pub mod table;

use std::io::{self, Write};

use serde::Serialize;

use crate::composition::CompositionEntry;
use crate::resolver::ExportSpec;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Aligned table for humans.
    Table,
    /// Structured JSON for machine consumption.
    Json,
}

/// Identifies one measurement taken during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementId {
    /// Minified dist size.
    SizeMinified,
    /// Minified dist size after gzip.
    SizeMinifiedGzipped,
    /// Minified dist size after brotli.
    SizeMinifiedBrotli,
    /// Installed node_modules size.
    NodeModulesSize,
    /// Installed node_modules file count.
    NodeModulesFiles,
}

/// The unit a measurement value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Unit {
    /// Exact byte count.
    Bytes,
    /// Plain count.
    Count,
}

impl MeasurementId {
    /// Human-readable caption for table output.
    pub fn caption(&self) -> &'static str {
        match self {
            MeasurementId::SizeMinified => "minified",
            MeasurementId::SizeMinifiedGzipped => "minified + gzip",
            MeasurementId::SizeMinifiedBrotli => "minified + brotli",
            MeasurementId::NodeModulesSize => "node_modules size",
            MeasurementId::NodeModulesFiles => "node_modules files",
        }
    }

    /// The unit values with this id are expressed in.
    pub fn unit(&self) -> Unit {
        match self {
            MeasurementId::NodeModulesFiles => Unit::Count,
            _ => Unit::Bytes,
        }
    }
}

/// One measurement taken during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    /// What was measured.
    pub id: MeasurementId,
    /// The measured value, always a non-negative integer.
    pub value: u64,
    /// The unit of `value`.
    pub unit: Unit,
}

impl MeasurementRecord {
    /// Creates a record; the unit is derived from the id.
    pub fn new(id: MeasurementId, value: u64) -> Self {
        Self {
            id,
            value,
            unit: id.unit(),
        }
    }
}

/// Set of measurement records with at-most-one-per-id semantics.
#[derive(Debug, Clone, Default)]
pub struct Measurements {
    records: Vec<MeasurementRecord>,
}

impl Measurements {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, or is a no-op if its id is already present.
    pub fn add(&mut self, record: MeasurementRecord) {
        if self.get(record.id).is_none() {
            self.records.push(record);
        }
    }

    /// Looks up the record for an id, if one was taken.
    pub fn get(&self, id: MeasurementId) -> Option<&MeasurementRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Returns true if no measurement was taken.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Metadata about the measured package.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    /// Package name as requested on the command line.
    pub name: String,
    /// Version requested on the command line, if any.
    pub requested_version: Option<String>,
    /// Version actually installed, if the manifest was readable.
    pub installed_version: Option<String>,
}

/// Everything a run produced, ready to render.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// The measured package.
    pub package: PackageInfo,
    /// Subpath exports the installed manifest declares.
    pub declared_exports: Vec<String>,
    /// The resolved export specs that were bundled.
    pub exports: Vec<ExportSpec>,
    /// Measurement records, at most one per id.
    pub measurements: Measurements,
    /// Composition entries in render order (self first, then by size).
    pub composition: Vec<CompositionEntry>,
    /// Dependency listing the bundler emitted, when it produced one.
    pub dependencies: Vec<String>,
    /// Non-fatal warnings collected along the way.
    pub warnings: Vec<String>,
}

/// Renders a report in the given format.
pub fn render<W: Write>(format: ReportFormat, report: &Report, writer: &mut W) -> io::Result<()> {
    match format {
        ReportFormat::Table => table::render(report, writer),
        ReportFormat::Json => json::render(report, writer),
    }
}

/// Renders a report to a string.
pub fn render_to_string(format: ReportFormat, report: &Report) -> io::Result<String> {
    let mut buffer = Vec::new();
    render(format, report, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Formats a byte count in binary units (B / KiB / MiB).
///
/// # Example
///
/// ```
/// use packscope::report::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.50 KiB");
/// assert_eq!(format_size(2 * 1024 * 1024), "2.00 MiB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_binary_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KiB");
        assert_eq!(format_size(1536), "1.50 KiB");
        assert_eq!(format_size(1048576), "1.00 MiB");
    }

    #[test]
    fn test_measurements_set_semantics() {
        let mut measurements = Measurements::new();
        measurements.add(MeasurementRecord::new(MeasurementId::SizeMinified, 100));
        measurements.add(MeasurementRecord::new(MeasurementId::SizeMinified, 999));

        // First write wins; re-adding the same id is a no-op.
        assert_eq!(measurements.records().len(), 1);
        assert_eq!(
            measurements.get(MeasurementId::SizeMinified).unwrap().value,
            100
        );
    }

    #[test]
    fn test_measurement_unit_derived_from_id() {
        let bytes = MeasurementRecord::new(MeasurementId::NodeModulesSize, 1);
        let count = MeasurementRecord::new(MeasurementId::NodeModulesFiles, 1);

        assert_eq!(bytes.unit, Unit::Bytes);
        assert_eq!(count.unit, Unit::Count);
    }

    #[test]
    fn test_measurements_preserve_insertion_order() {
        let mut measurements = Measurements::new();
        measurements.add(MeasurementRecord::new(MeasurementId::SizeMinified, 1));
        measurements.add(MeasurementRecord::new(
            MeasurementId::SizeMinifiedGzipped,
            2,
        ));
        measurements.add(MeasurementRecord::new(MeasurementId::NodeModulesSize, 3));

        let ids: Vec<MeasurementId> = measurements.records().iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                MeasurementId::SizeMinified,
                MeasurementId::SizeMinifiedGzipped,
                MeasurementId::NodeModulesSize,
            ]
        );
    }
}
