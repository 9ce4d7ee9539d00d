//! Directory batch processing.
//!
//! Files are extracted in parallel; results are reported in path order.
//! One unreadable file never stops the batch.

use mediscribe_core::{ExtractedRecord, RecordMetadata, RecordRepository};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::ExtractionEngine;

/// The batch itself could not start.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid file pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to list {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One extracted file.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: PathBuf,
    pub record: ExtractedRecord,
}

/// One file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<BatchItem>,
    pub failed: Vec<BatchFailure>,
}

/// Outcome of [`ingest_dir`]: stored record IDs and failures.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub stored: Vec<(PathBuf, String)>,
    pub failed: Vec<BatchFailure>,
}

/// Regular files directly under `dir` whose name matches `pattern`, sorted.
///
/// # Errors
/// Returns an error if the pattern is invalid or `dir` cannot be listed.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, BatchError> {
    let glob_pattern = glob::Pattern::new(pattern).map_err(|source| BatchError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let list_err = |source| BatchError::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let entry_path = entry.map_err(list_err)?.path();
        let matches = entry_path
            .file_name()
            .is_some_and(|name| glob_pattern.matches(&name.to_string_lossy()));
        if matches && entry_path.is_file() {
            paths.push(entry_path);
        }
    }
    paths.sort();

    Ok(paths)
}

/// Extract every matching file in `dir`. Each record's `source` is the
/// file path.
///
/// # Errors
/// Returns an error only if the files cannot be enumerated.
pub fn extract_dir(
    engine: &ExtractionEngine,
    dir: &Path,
    pattern: &str,
) -> Result<BatchReport, BatchError> {
    let paths = matching_files(dir, pattern)?;
    info!("Found {} file(s) to process in {}", paths.len(), dir.display());

    let results: Vec<_> = paths
        .into_par_iter()
        .map(|path| {
            let metadata = RecordMetadata::default().with_source(path.display().to_string());
            let result = engine.extract_from_file(&path, metadata);
            (path, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok(record) => report.succeeded.push(BatchItem { path, record }),
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                report.failed.push(BatchFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Extract every matching file in `dir` and append the records to
/// `repository` in path order.
///
/// # Errors
/// Returns an error only if the files cannot be enumerated.
pub fn ingest_dir<R: RecordRepository>(
    engine: &ExtractionEngine,
    repository: &R,
    dir: &Path,
    pattern: &str,
) -> Result<IngestReport, BatchError> {
    let report = extract_dir(engine, dir, pattern)?;
    let mut ingest = IngestReport {
        stored: Vec::with_capacity(report.succeeded.len()),
        failed: report.failed,
    };

    for BatchItem { path, record } in report.succeeded {
        match repository.append(record) {
            Ok(record_id) => ingest.stored.push((path, record_id)),
            Err(e) => {
                warn!("Failed to store record from {}: {e}", path.display());
                ingest.failed.push(BatchFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        "Batch complete: {} stored, {} failed",
        ingest.stored.len(),
        ingest.failed.len()
    );

    Ok(ingest)
}
