//! N-way merger (C3): min-heap merge of all run files into a single
//! globally ordered line stream, grounded in the teacher's
//! `LogStore::merge_sorted_sources` min-heap idiom.

use crate::gzip_io;
use crate::parser::{cmp_order, parse_logline, LogLine};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::BufRead;
use std::path::PathBuf;

struct HeapEntry {
    line: LogLine,
    source_idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        cmp_order(&self.line, &other.line) == Ordering::Equal && self.source_idx == other.source_idx
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_order(&self.line, &other.line).then_with(|| self.source_idx.cmp(&other.source_idx))
    }
}

/// Streams a globally ordered sequence of [`LogLine`]s out of many
/// independently sorted run files. A run that fails to open is logged and
/// skipped (non-fatal); a line within a run that fails to re-parse is
/// skipped too.
pub struct NWayMerge {
    sources: Vec<Box<dyn BufRead>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl NWayMerge {
    /// # Errors
    /// Never returns an error itself — open failures on individual runs are
    /// logged and the run is skipped, matching spec §4.3's degraded-input
    /// policy. The `Result` return exists for symmetry with other stages.
    pub fn open(run_paths: &[PathBuf]) -> std::io::Result<Self> {
        let mut sources: Vec<Box<dyn BufRead>> = Vec::new();
        let mut heap = BinaryHeap::new();

        for path in run_paths {
            match gzip_io::open_lines(path) {
                Ok(reader) => {
                    let source_idx = sources.len();
                    sources.push(reader);
                    if let Some(entry) = Self::next_valid_line(&mut sources[source_idx], source_idx) {
                        heap.push(Reverse(entry));
                    }
                }
                Err(err) => {
                    log::warn!("skipping unopenable run file {}: {err}", path.display());
                }
            }
        }

        Ok(Self { sources, heap })
    }

    fn next_valid_line(reader: &mut Box<dyn BufRead>, source_idx: usize) -> Option<HeapEntry> {
        let mut raw = String::new();
        loop {
            raw.clear();
            let n = reader.read_line(&mut raw).ok()?;
            if n == 0 {
                return None;
            }
            let trimmed = raw.trim_end_matches('\n');
            if let Some(line) = parse_logline(trimmed) {
                return Some(HeapEntry { line, source_idx });
            }
        }
    }
}

impl Iterator for NWayMerge {
    type Item = LogLine;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(entry) = self.heap.pop()?;
        let source_idx = entry.source_idx;
        if let Some(next_entry) = Self::next_valid_line(&mut self.sources[source_idx], source_idx) {
            self.heap.push(Reverse(next_entry));
        }
        Some(entry.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_run(dir: &Path, name: &str, tokens: &[i64]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = gzip_io::create_gz_writer(&path).expect("writer");
        for token in tokens {
            writeln!(
                writer,
                "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 {token} 202 203 D Tag: payload"
            )
            .expect("write");
        }
        gzip_io::finish_gz_writer(writer).expect("finish");
        path
    }

    use std::path::Path;

    #[test]
    fn merges_two_sorted_runs_into_one_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_run(dir.path(), "a.gz", &[1, 3, 5]);
        let b = write_run(dir.path(), "b.gz", &[2, 4, 6]);

        let tokens: Vec<i64> = NWayMerge::open(&[a, b])
            .expect("open")
            .map(|l| l.logcat_token)
            .collect();
        assert_eq!(tokens, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn skips_unopenable_run_without_failing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_run(dir.path(), "a.gz", &[1, 2]);
        let missing = dir.path().join("missing.gz");

        let tokens: Vec<i64> = NWayMerge::open(&[a, missing])
            .expect("open")
            .map(|l| l.logcat_token)
            .collect();
        assert_eq!(tokens, vec![1, 2]);
    }
}
