//! Temperature/battery correlator (spec §4.8): the most elaborate analysis
//! consumer, chunking a boot's lines between battery-level resets. Grounded
//! in `temp_battery_correlation_new.go`'s `tbcBootConsumer` state machine.

use crate::boot::assert_non_decreasing;
use crate::error::StitchError;
use crate::filters::cpu_tracker::CpuEntry;
use crate::filters::{CpuTracker, FgBgState, FgBgTracker};
use crate::gzip_io;
use crate::parser::printk::{parse_printk_event, Healthd, PrintkEvent};
use crate::parser::LogLine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;

/// One chunk of a boot's activity between two battery-level samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbcChunk {
    pub start: Healthd,
    pub start_cpu_state: HashMap<u32, CpuEntry>,
    pub start_fgbg_state: FgBgState,
    pub data: Vec<LogLine>,
    pub end: Option<Healthd>,
}

fn new_chunk(start: Healthd, cpu_tracker: &CpuTracker, fgbg_tracker: &FgBgTracker) -> TbcChunk {
    TbcChunk {
        start,
        start_cpu_state: cpu_tracker.snapshot(),
        start_fgbg_state: fgbg_tracker.snapshot(),
        data: Vec::new(),
        end: None,
    }
}

/// Run the per-boot chunker state machine over `lines`, invoking `emit`
/// for every closed chunk. An ordering violation on `logcat_token` is
/// fatal, matching the original's hard-stop behavior.
///
/// # Errors
/// Returns [`StitchError::OrderingViolation`] if `lines` is not
/// non-decreasing by `logcat_token`.
pub fn run_boot_consumer(
    lines: impl Iterator<Item = LogLine>,
    boot_id: &str,
    mut emit: impl FnMut(TbcChunk),
) -> Result<(), StitchError> {
    let mut cpu_tracker = CpuTracker::new();
    let mut fgbg_tracker = FgBgTracker::new();
    let mut recent_event = true;
    let mut healthd_level: i32 = -1;
    let mut open_chunk: Option<TbcChunk> = None;
    let mut last_token: Option<i64> = None;

    for line in lines {
        assert_non_decreasing(boot_id, last_token, line.logcat_token)?;
        last_token = Some(line.logcat_token);

        cpu_tracker.observe(&line);
        fgbg_tracker.observe(&line);

        let Some(PrintkEvent::Healthd(healthd)) = parse_printk_event(&line) else {
            if let Some(chunk) = &mut open_chunk {
                chunk.data.push(line);
            }
            continue;
        };

        if recent_event {
            healthd_level = healthd.level;
            recent_event = false;
        }

        if healthd.is_charging() {
            healthd_level = healthd.level;
            open_chunk = None;
            continue;
        }

        if healthd_level != -1 && healthd.level <= healthd_level - 1 {
            healthd_level = -1;
            if let Some(mut chunk) = open_chunk.take() {
                chunk.end = Some(healthd.clone());
                emit(chunk);
            }
            open_chunk = Some(new_chunk(healthd, &cpu_tracker, &fgbg_tracker));
            continue;
        }

        if healthd_level == -1 {
            match &open_chunk {
                Some(chunk) if healthd.level == chunk.start.level => {
                    let healthd_line = healthd.line.clone();
                    if let Some(chunk) = &mut open_chunk {
                        chunk.data.push(healthd_line);
                    }
                }
                Some(chunk) if healthd.level == chunk.start.level - 1 => {
                    if let Some(mut chunk) = open_chunk.take() {
                        chunk.end = Some(healthd.clone());
                        emit(chunk);
                    }
                    open_chunk = Some(new_chunk(healthd, &cpu_tracker, &fgbg_tracker));
                }
                None => {
                    open_chunk = Some(new_chunk(healthd, &cpu_tracker, &fgbg_tracker));
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

/// Gzip-JSON-serialize each chunk under
/// `<device_dir>/analysis/temp_battery/NNNNNNNN.gz`, then write the
/// per-device `meta.json` idempotence sentinel.
pub fn save_chunks(
    device_dir: &Path,
    boot_chunk_counts: &HashMap<String, usize>,
    chunks_by_index: impl Iterator<Item = (usize, TbcChunk)>,
) -> std::io::Result<()> {
    let out_dir = device_dir.join("analysis").join("temp_battery");
    std::fs::create_dir_all(&out_dir)?;

    for (idx, chunk) in chunks_by_index {
        let path = out_dir.join(format!("{idx:08}.gz"));
        let json = serde_json::to_vec(&chunk)?;
        let mut writer = gzip_io::create_gz_writer(&path)?;
        writer.write_all(&json)?;
        gzip_io::finish_gz_writer(writer)?;
    }

    let meta_path = out_dir.join("meta.json");
    let meta_json = serde_json::to_string_pretty(boot_chunk_counts)?;
    std::fs::write(meta_path, meta_json)?;
    Ok(())
}

/// `meta.json`'s presence is the "done" sentinel for this device (spec
/// §4.8: idempotent resume).
#[must_use]
pub fn is_done(device_dir: &Path) -> bool {
    device_dir
        .join("analysis")
        .join("temp_battery")
        .join("meta.json")
        .exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_logline;

    fn healthd_line(token: i64, level: i32, charging: bool) -> LogLine {
        let chg = if charging { "u" } else { "" };
        let raw = format!(
            "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 {token} 202 203 I KernelPrintk: healthd: battery l={level} v=4000 t=25.0 h=2 st=2 c=0 chg={chg}"
        );
        parse_logline(&raw).expect("line parses")
    }

    fn plain_line(token: i64) -> LogLine {
        let raw = format!(
            "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 {token} 202 203 D Tag: payload"
        );
        parse_logline(&raw).expect("line parses")
    }

    #[test]
    fn one_level_drop_closes_and_reopens_chunk() {
        let lines = vec![
            healthd_line(1, 80, false),
            plain_line(2),
            healthd_line(3, 79, false),
            plain_line(4),
        ];

        let mut emitted = Vec::new();
        run_boot_consumer(lines.into_iter(), "boot", |chunk| emitted.push(chunk)).expect("runs");

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].start.level, 80);
        assert_eq!(emitted[0].end.as_ref().expect("end").level, 79);
        assert_eq!(emitted[0].data.len(), 1);
    }

    #[test]
    fn charging_event_discards_open_chunk_without_emitting() {
        let lines = vec![
            healthd_line(1, 80, false),
            plain_line(2),
            healthd_line(3, 90, true),
        ];

        let mut emitted = Vec::new();
        run_boot_consumer(lines.into_iter(), "boot", |chunk| emitted.push(chunk)).expect("runs");
        assert!(emitted.is_empty());
    }

    #[test]
    fn ordering_violation_aborts_the_consumer() {
        let lines = vec![plain_line(5), plain_line(4)];
        let result = run_boot_consumer(lines.into_iter(), "boot", |_| {});
        assert!(result.is_err());
    }
}
