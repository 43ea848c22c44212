//! Raw and compressed size measurement over sets of files.
//!
//! Sizes are always exact integer byte counts: raw sizes come from stat,
//! compressed sizes from actually compressing each file's content. Gzip runs
//! at maximum compression and brotli at maximum quality, so identical input
//! bytes always measure the same.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use serde::Serialize;
use walkdir::WalkDir;

/// Errors that can occur during size measurement.
#[derive(Debug, thiserror::Error)]
pub enum SizeError {
    /// A file vanished or became unreadable between listing and measuring.
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed.
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A concurrent measurement task was cancelled or panicked.
    #[error("Measurement task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type alias for size operations.
pub type SizeResult<T> = Result<T, SizeError>;

/// A compression method applied when measuring file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// No compression: raw on-disk size.
    None,
    /// Gzip at maximum compression level.
    Gzip,
    /// Brotli at maximum quality.
    Brotli,
}

/// Per-method size totals for one measured file set.
///
/// `gzip` and `brotli` are present exactly when the corresponding method was
/// requested; the raw total is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedSizes {
    /// Sum of uncompressed byte lengths.
    pub raw: u64,
    /// Sum of gzip-compressed byte lengths, if gzip was requested.
    pub gzip: Option<u64>,
    /// Sum of brotli-compressed byte lengths, if brotli was requested.
    pub brotli: Option<u64>,
}

/// Recursively lists the regular files under a directory.
///
/// Directories and symlinks are excluded; the order of the returned paths is
/// unspecified. A missing root yields an error rather than an empty list.
pub fn list_files(dir: &Path) -> SizeResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Sums the raw on-disk byte lengths of the given files.
///
/// A path that vanished between listing and statting surfaces as an error;
/// there are no retries.
pub fn size_of(paths: &[PathBuf]) -> SizeResult<u64> {
    let mut total = 0u64;
    for path in paths {
        let metadata = fs::metadata(path).map_err(|source| SizeError::FileRead {
            path: path.clone(),
            source,
        })?;
        total += metadata.len();
    }
    Ok(total)
}

/// Computes raw plus requested compressed size totals over a file set.
///
/// Each file's content is read once, then the requested compressions run
/// concurrently across files; per-method totals are combined by plain
/// summation, so completion order never affects the result. When `None` is
/// the only requested method, content reads are skipped entirely and stat
/// sizes are used instead.
pub async fn compressed_size_of(
    paths: &[PathBuf],
    methods: &HashSet<Method>,
) -> SizeResult<CompressedSizes> {
    let want_gzip = methods.contains(&Method::Gzip);
    let want_brotli = methods.contains(&Method::Brotli);

    if !want_gzip && !want_brotli {
        return Ok(CompressedSizes {
            raw: size_of(paths)?,
            gzip: None,
            brotli: None,
        });
    }

    let tasks: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| {
            tokio::task::spawn_blocking(move || measure_file(&path, want_gzip, want_brotli))
        })
        .collect();

    let mut totals = CompressedSizes {
        raw: 0,
        gzip: want_gzip.then_some(0),
        brotli: want_brotli.then_some(0),
    };
    for joined in futures::future::join_all(tasks).await {
        let file = joined??;
        totals.raw += file.raw;
        if let (Some(total), Some(size)) = (totals.gzip.as_mut(), file.gzip) {
            *total += size;
        }
        if let (Some(total), Some(size)) = (totals.brotli.as_mut(), file.brotli) {
            *total += size;
        }
    }
    Ok(totals)
}

/// Reads one file and computes its requested compressed lengths.
fn measure_file(path: &Path, gzip: bool, brotli: bool) -> SizeResult<CompressedSizes> {
    let content = fs::read(path).map_err(|source| SizeError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let gzip_len = if gzip {
        Some(gzip_size(&content).map_err(|source| SizeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?)
    } else {
        None
    };
    let brotli_len = if brotli {
        Some(brotli_size(&content).map_err(|source| SizeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?)
    } else {
        None
    };

    Ok(CompressedSizes {
        raw: content.len() as u64,
        gzip: gzip_len,
        brotli: brotli_len,
    })
}

/// Gzip-compresses a buffer at maximum level and returns the output length.
fn gzip_size(content: &[u8]) -> io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::best());
    encoder.write_all(content)?;
    Ok(encoder.finish()?.len() as u64)
}

/// Brotli-compresses a buffer at maximum quality and returns the output length.
fn brotli_size(content: &[u8]) -> io::Result<u64> {
    // Quality 11, window 22: the encoder's maximum settings.
    let mut compressed = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 11, 22);
        writer.write_all(content)?;
        writer.flush()?;
    }
    Ok(compressed.len() as u64)
}
