//! Explicit configuration, built once by the CLI and threaded by value
//! through the stitcher and analysis harness. No module holds global state.

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_BUFSIZE: u64 = 100 * 1024 * 1024;
pub const LINES_PER_SHARD: usize = 1_000_000;
pub const SHARD_INDEX_WIDTH: usize = 8;
pub const BOOT_WRITER_CHANNEL_CAPACITY: usize = 10_000;
pub const DEVICE_CONCURRENCY: usize = 20;
pub const BOOT_CONCURRENCY: usize = 8;

/// Stitcher CLI arguments, mirrored 1:1 into a [`Config`].
#[derive(Debug, Parser)]
#[command(name = "logshard", about = "Stitch logcat archives into per-boot shards")]
pub struct Args {
    /// Root directory holding (or to hold) the source archive and shard tree.
    pub path: PathBuf,

    /// Comma-separated glob patterns selecting input files.
    #[arg(short = 'r', long = "regex", default_value = "*.out.gz")]
    pub regex: String,

    /// Bytes per external-sort chunk.
    #[arg(short = 'b', long = "bufsize", default_value_t = DEFAULT_BUFSIZE)]
    pub bufsize: u64,

    /// Reuse existing `*chunk*.gz` run files instead of re-sorting.
    #[arg(short = 's', long = "split-only", default_value_t = false)]
    pub split_only: bool,

    /// Remove intermediate run files once the split completes.
    #[arg(long = "delete", default_value_t = false)]
    pub delete: bool,
}

/// Config threaded through the stitcher; built once from [`Args`].
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub globs: Vec<String>,
    pub bufsize: u64,
    pub split_only: bool,
    pub delete_intermediate: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let globs = args.regex.split(',').map(str::to_owned).collect();
        Self {
            root: args.path,
            globs,
            bufsize: args.bufsize,
            split_only: args.split_only,
            delete_intermediate: args.delete,
        }
    }
}

/// Config for the analysis harness (C8); separate from the stitcher's
/// [`Config`] since the two CLIs take different flags.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub root: PathBuf,
    pub globs: Vec<String>,
    pub device_filter: Option<Vec<String>>,
}

impl AnalysisConfig {
    #[must_use]
    pub fn new(root: PathBuf, globs: Vec<String>, device_filter: Option<Vec<String>>) -> Self {
        Self {
            root,
            globs,
            device_filter,
        }
    }

    #[must_use]
    pub fn wants_device(&self, device_id: &str) -> bool {
        match &self.device_filter {
            None => true,
            Some(allow) => allow.iter().any(|d| d == device_id),
        }
    }
}
