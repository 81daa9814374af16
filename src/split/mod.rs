//! Boot splitter (C4): routes the merged line stream into per-boot output
//! directories as size-capped gzipped shards, extending prior runs rather
//! than rewriting them. One writer thread per boot, fed over a bounded
//! channel — the teacher's `thread::spawn` + `mpsc` idiom
//! (`core/filter_worker.rs`), generalized from one global worker to one
//! worker per boot.

use crate::config::{BOOT_WRITER_CHANNEL_CAPACITY, LINES_PER_SHARD, SHARD_INDEX_WIDTH};
use crate::error::StitchError;
use crate::gzip_io;
use crate::parser::LogLine;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::JoinHandle;

fn shard_stem(filename: &str) -> &str {
    let mut s = filename;
    while let Some(stripped) = s.strip_suffix(".gz") {
        s = stripped;
    }
    s
}

/// Resolve the next shard index for a boot directory per spec §4.4: scan
/// existing `*.gz` shards and resume one past the highest index found.
fn resume_index(boot_dir: &Path) -> std::io::Result<u64> {
    let mut max_index: Option<u64> = None;
    if boot_dir.exists() {
        for entry in std::fs::read_dir(boot_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(".gz") {
                continue;
            }
            if let Ok(index) = shard_stem(name).parse::<u64>() {
                max_index = Some(max_index.map_or(index, |m| m.max(index)));
            }
        }
    }
    Ok(max_index.map_or(0, |m| m + 1))
}

struct ShardWriter {
    boot_dir: PathBuf,
    next_index: u64,
    cur_line_count: usize,
    pending: Option<String>,
    writer: Option<BufWriter<GzEncoder<File>>>,
}

impl ShardWriter {
    fn shard_path(&self) -> PathBuf {
        self.boot_dir.join(format!(
            "{:0width$}.gz",
            self.next_index,
            width = SHARD_INDEX_WIDTH
        ))
    }

    fn open_shard(&mut self) -> std::io::Result<()> {
        let path = self.shard_path();
        self.writer = Some(gzip_io::create_gz_writer(&path)?);
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        if let Some(writer) = self.writer.take() {
            gzip_io::finish_gz_writer(writer)?;
        }
        self.next_index += 1;
        self.cur_line_count = 0;
        Ok(())
    }

    /// Writes the pending line, deciding the trailing newline: omitted iff
    /// this write completes the shard or the stream has ended (spec §4.4).
    fn flush_pending(&mut self, is_final: bool) -> std::io::Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if self.writer.is_none() {
            self.open_shard()?;
        }
        let completes_shard = self.cur_line_count + 1 == LINES_PER_SHARD;

        let writer = self
            .writer
            .as_mut()
            .expect("shard writer opened immediately above");
        writer.write_all(pending.as_bytes())?;
        if !completes_shard && !is_final {
            writer.write_all(b"\n")?;
        }
        self.cur_line_count += 1;

        if completes_shard {
            self.rotate()?;
        }
        if is_final {
            if let Some(writer) = self.writer.take() {
                gzip_io::finish_gz_writer(writer)?;
            }
        }
        Ok(())
    }

    fn push(&mut self, raw: String) -> std::io::Result<()> {
        self.flush_pending(false)?;
        self.pending = Some(raw);
        Ok(())
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.flush_pending(true)
    }
}

fn writer_thread(
    root: PathBuf,
    boot_id: String,
    delete_first: bool,
    rx: Receiver<String>,
) -> Result<(), StitchError> {
    let boot_dir = root.join(&boot_id);
    let next_index = if delete_first {
        if boot_dir.exists() {
            std::fs::remove_dir_all(&boot_dir).map_err(|source| StitchError::ShardWrite {
                path: boot_dir.clone(),
                source,
            })?;
        }
        std::fs::create_dir_all(&boot_dir).map_err(|source| StitchError::ShardWrite {
            path: boot_dir.clone(),
            source,
        })?;
        0
    } else {
        std::fs::create_dir_all(&boot_dir).map_err(|source| StitchError::ShardWrite {
            path: boot_dir.clone(),
            source,
        })?;
        resume_index(&boot_dir).map_err(|source| StitchError::ShardWrite {
            path: boot_dir.clone(),
            source,
        })?
    };

    let mut writer = ShardWriter {
        boot_dir: boot_dir.clone(),
        next_index,
        cur_line_count: 0,
        pending: None,
        writer: None,
    };

    for raw in rx {
        writer.push(raw).map_err(|source| StitchError::ShardWrite {
            path: boot_dir.clone(),
            source,
        })?;
    }
    writer
        .finish()
        .map_err(|source| StitchError::ShardWrite {
            path: boot_dir.clone(),
            source,
        })
}

/// Consume the merged line stream, routing each line to its boot's writer
/// thread over a bounded channel (spec §4.4, §5). Returns every boot id
/// seen, in first-sighting order.
pub fn split_into_boots(
    lines: impl Iterator<Item = LogLine>,
    root: &Path,
    delete_first: bool,
) -> Result<Vec<String>, StitchError> {
    let mut senders: HashMap<String, SyncSender<String>> = HashMap::new();
    let mut handles: Vec<JoinHandle<Result<(), StitchError>>> = Vec::new();
    let mut bootids = Vec::new();

    for line in lines {
        let boot_id = line.boot_id.clone();
        let sender = senders.entry(boot_id.clone()).or_insert_with(|| {
            bootids.push(boot_id.clone());
            let (tx, rx) = sync_channel::<String>(BOOT_WRITER_CHANNEL_CAPACITY);
            let root = root.to_path_buf();
            let boot_id_for_thread = boot_id.clone();
            handles.push(std::thread::spawn(move || {
                writer_thread(root, boot_id_for_thread, delete_first, rx)
            }));
            tx
        });
        // A send failure means the writer thread already died; its error
        // will surface when we join it below.
        let _ = sender.send(line.raw);
    }

    drop(senders);
    for handle in handles {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => {
                return Err(StitchError::ShardWrite {
                    path: root.to_path_buf(),
                    source: std::io::Error::other("boot writer thread panicked"),
                });
            }
        }
    }

    Ok(bootids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_logline;

    fn line(boot: &str, token: i64) -> LogLine {
        let raw = format!(
            "{boot} 2016-04-21 09:59:01.199025638 {token} 202 203 D Tag: payload-{token}"
        );
        parse_logline(&raw).expect("line parses")
    }

    #[test]
    fn writes_one_shard_per_boot_with_no_trailing_newline_at_eof() {
        let dir = tempfile::tempdir().expect("tempdir");
        let boot = "6b798b8c-68a2-4c6a-9e1a-123456789abc";
        let lines = vec![line(boot, 1), line(boot, 2), line(boot, 3)];

        let bootids = split_into_boots(lines.into_iter(), dir.path(), true).expect("split");
        assert_eq!(bootids, vec![boot.to_owned()]);

        let shard = dir.path().join(boot).join("00000000.gz");
        let mut reader = gzip_io::open_lines(&shard).expect("open shard");
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut reader, &mut contents).expect("read");
        assert!(!contents.ends_with("\n\n"));
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn resumes_shard_index_when_not_deleting_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let boot = "6b798b8c-68a2-4c6a-9e1a-123456789abc";
        split_into_boots(vec![line(boot, 1)].into_iter(), dir.path(), true).expect("first split");
        split_into_boots(vec![line(boot, 2)].into_iter(), dir.path(), false)
            .expect("second split");

        let boot_dir = dir.path().join(boot);
        assert!(boot_dir.join("00000000.gz").exists());
        assert!(boot_dir.join("00000001.gz").exists());
    }
}
