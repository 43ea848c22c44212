//! packscope - measure the installed and bundled footprint of npm packages
//!
//! This crate installs a published package into an isolated workspace,
//! bundles re-export entries for its selected subpath exports, and reports
//! minified / gzip / brotli sizes plus a per-dependency composition
//! breakdown derived from sourcemap analysis.

pub mod cli;
pub mod composition;
pub mod external;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod size;
pub mod workspace;
