//! Typed error surfaces for the stitcher and analysis kernel.
//!
//! Leaves return one of these; `main` collapses them into an `anyhow::Error`
//! with full context via `anyhow::Context`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can terminate a stitch run.
///
/// Per the error-handling disposition: a bad *source* file is logged and
/// skipped (never surfaced as a `StitchError`), while a bad *spill* or
/// *shard* is fatal and propagates as one of these variants.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("failed to write manifest at {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("fatal I/O error writing spill run {path}: {source}")]
    SpillWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fatal I/O error writing shard {path}: {source}")]
    ShardWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ordering violation in boot {boot_id}: token {prev} followed by {next}")]
    OrderingViolation {
        boot_id: String,
        prev: i64,
        next: i64,
    },
}

/// Errors reading or writing `info.json` manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the boot reader and analysis harness.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("boot directory not found: {0}")]
    BootNotFound(PathBuf),

    #[error("I/O error reading shard {path}: {source}")]
    ShardRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
