//! Boot reader (C6): for an existing boot directory, emit all lines in
//! shard order, gated by a chain of line filters, over a bounded channel.
//! One exclusive reader per boot — a second concurrent `stream` call blocks
//! until the first completes (spec §4.6, §5).

use crate::config::BOOT_WRITER_CHANNEL_CAPACITY;
use crate::error::{AnalysisError, StitchError};
use crate::filters::Filter;
use crate::gzip_io;
use crate::parser::{parse_logline, LogLine};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::{Arc, Mutex};

/// A boot directory: its shards in lexicographic (== index) order.
pub struct Boot {
    pub device_id: Option<String>,
    pub boot_id: String,
    #[allow(dead_code)]
    path: PathBuf,
    shards: Vec<PathBuf>,
    read_lock: Arc<Mutex<()>>,
}

impl Boot {
    /// Open `<root>[/<device_id>]/<boot_id>` and enumerate its shards.
    ///
    /// # Errors
    /// Returns [`AnalysisError::BootNotFound`] if the directory is absent.
    pub fn open(
        root: &Path,
        device_id: Option<&str>,
        boot_id: &str,
    ) -> Result<Self, AnalysisError> {
        let path = match device_id {
            Some(device_id) => root.join(device_id).join(boot_id),
            None => root.join(boot_id),
        };
        if !path.is_dir() {
            return Err(AnalysisError::BootNotFound(path));
        }

        let mut shards: Vec<PathBuf> = std::fs::read_dir(&path)
            .map_err(|source| AnalysisError::ShardRead {
                path: path.clone(),
                source,
            })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "gz"))
            .collect();
        shards.sort();

        Ok(Self {
            device_id: device_id.map(str::to_owned),
            boot_id: boot_id.to_owned(),
            path,
            shards,
            read_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Stream every surviving line on a bounded channel. Spawns a reader
    /// thread holding this boot's exclusive lock for the duration; a
    /// second concurrent call blocks until the first reader finishes.
    ///
    /// A line survives iff every stage in `filters` returns true, evaluated
    /// in registration order with short-circuit (spec §4.7, C7).
    pub fn stream(&self, filters: Filter) -> Receiver<LogLine> {
        let (tx, rx) = sync_channel(BOOT_WRITER_CHANNEL_CAPACITY);
        let shards = self.shards.clone();
        let boot_id = self.boot_id.clone();
        let read_lock = Arc::clone(&self.read_lock);

        std::thread::spawn(move || {
            let _guard = read_lock
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            for shard in &shards {
                let reader = match gzip_io::open_lines(shard) {
                    Ok(reader) => reader,
                    Err(err) => {
                        log::error!(
                            "boot {boot_id}: failed to read shard {}: {err}",
                            shard.display()
                        );
                        return;
                    }
                };
                if !Self::drain_shard(reader, &filters, &tx) {
                    return;
                }
            }
        });
        rx
    }

    fn drain_shard(
        reader: Box<dyn BufRead>,
        filters: &Filter,
        tx: &std::sync::mpsc::SyncSender<LogLine>,
    ) -> bool {
        for raw in reader.lines() {
            let Ok(raw) = raw else { continue };
            let Some(line) = parse_logline(&raw) else {
                continue;
            };
            if !filters.passes(&line) {
                continue;
            }
            if tx.send(line).is_err() {
                return false;
            }
        }
        true
    }
}

/// Fatal ordering-violation guard (spec §9, invariant I1): aborts the
/// process the instant a non-decreasing `logcat_token` sequence breaks,
/// matching the original's hard-stop consumer behavior.
pub fn assert_non_decreasing(
    boot_id: &str,
    prev_token: Option<i64>,
    next_token: i64,
) -> Result<(), StitchError> {
    if let Some(prev) = prev_token {
        if next_token < prev {
            return Err(StitchError::OrderingViolation {
                boot_id: boot_id.to_owned(),
                prev,
                next: next_token,
            });
        }
    }
    Ok(())
}
