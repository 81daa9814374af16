//! Grammar for a single logcat/kernel-trace line (spec §6): phonelab
//! (preferred) and classic (fallback).

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

static PHONELAB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<device_id>[0-9a-fA-F]+)\s+
        (?P<ts>\d+)\s+
        (?P<ts_sub>\d+\.\d+)\s+
        (?P<boot_id>[0-9a-f-]{36})\s+
        (?P<logcat_token>-?\d+)\s+
        (?P<tracetime>\d+\.\d+)\s+
        (?P<datetime>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d+)\s+
        (?P<pid>-?\d+)\s+
        (?P<tid>-?\d+)\s+
        (?P<level>[A-Z])\s+
        (?P<tag>\S+):\s*
        (?P<payload>.*)$
        ",
    )
    .expect("static phonelab pattern is valid")
});

static CLASSIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<boot_id>[0-9a-f-]{36})\s+
        (?P<datetime>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d+)\s+
        (?P<logcat_token>-?\d+)\s+
        (?:\[(?P<tracetime>\d+\.\d+)\]\s+)?
        (?P<pid>-?\d+)\s+
        (?P<tid>-?\d+)\s+
        (?P<level>[A-Z])\s+
        (?P<tag>\S+):\s*
        (?P<payload>.*)$
        ",
    )
    .expect("static classic pattern is valid")
});

/// A parsed log line. Immutable after construction (spec §3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogLine {
    pub raw: String,
    pub boot_id: String,
    pub datetime: NaiveDateTime,
    /// Raw fractional digits after the dot, not normalized to a fixed width.
    pub datetime_nanos: i64,
    pub logcat_token: i64,
    pub tracetime: f64,
    pub pid: i32,
    pub tid: i32,
    pub level: char,
    pub tag: String,
    pub payload: String,
}

/// Ordering key per spec §4.1: `boot_id`, then `logcat_token`, then
/// `tracetime`. Used by the external sorter, the n-way merger, and the
/// boot-reader verifier — never wall-clock.
#[must_use]
pub fn cmp_order(a: &LogLine, b: &LogLine) -> Ordering {
    a.boot_id
        .cmp(&b.boot_id)
        .then_with(|| a.logcat_token.cmp(&b.logcat_token))
        .then_with(|| a.tracetime.partial_cmp(&b.tracetime).unwrap_or(Ordering::Equal))
}

fn parse_datetime(raw: &str) -> Option<(NaiveDateTime, i64)> {
    let (date_part, time_part) = raw.split_once(' ')?;
    let (hms, frac) = time_part.split_once('.')?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let time = chrono::NaiveTime::parse_from_str(hms, "%H:%M:%S").ok()?;

    let datetime_nanos: i64 = frac.parse().ok()?;
    let micros_str: String = frac.chars().chain(std::iter::repeat('0')).take(6).collect();
    let micros: u32 = micros_str.parse().ok()?;
    let ndt = NaiveDateTime::new(date, time)
        .checked_add_signed(chrono::Duration::microseconds(i64::from(micros)))?;

    Some((ndt, datetime_nanos))
}

/// Parse one raw line, trying phonelab first and falling back to classic.
/// Fail-soft: any field-parse failure discards the whole line.
#[must_use]
pub fn parse_logline(raw: &str) -> Option<LogLine> {
    if let Some(caps) = PHONELAB_PATTERN.captures(raw) {
        return build_logline(raw, &caps);
    }
    if let Some(caps) = CLASSIC_PATTERN.captures(raw) {
        return build_logline(raw, &caps);
    }
    None
}

fn build_logline(raw: &str, caps: &regex::Captures<'_>) -> Option<LogLine> {
    let boot_id = caps.name("boot_id")?.as_str().to_owned();
    let (datetime, datetime_nanos) = parse_datetime(caps.name("datetime")?.as_str())?;
    let logcat_token: i64 = caps.name("logcat_token")?.as_str().parse().ok()?;
    let tracetime: f64 = caps
        .name("tracetime")
        .map_or(Ok(0.0), |m| m.as_str().parse())
        .ok()?;
    let pid: i32 = caps.name("pid")?.as_str().parse().ok()?;
    let tid: i32 = caps.name("tid")?.as_str().parse().ok()?;
    let level: char = caps.name("level")?.as_str().chars().next()?;
    let tag = caps.name("tag")?.as_str().to_owned();
    let payload = caps.name("payload")?.as_str().to_owned();

    Some(LogLine {
        raw: raw.to_owned(),
        boot_id,
        datetime,
        datetime_nanos,
        logcat_token,
        tracetime,
        pid,
        tid,
        level,
        tag,
        payload,
    })
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn classic_line(
        boot_id: &str,
        token: i64,
        tracetime: f64,
        pid: i32,
        tid: i32,
        level: char,
        tag: &str,
        payload: &str,
    ) -> String {
        format!(
            "{boot_id} 2016-04-21 09:59:01.199025638 {token} [{tracetime:.6}] {pid} {tid} {level} {tag}: {payload}"
        )
    }

    proptest! {
        /// P7: any line generated from the classic grammar's valid field
        /// space round-trips — `parse_logline(L).raw == L`.
        #[test]
        fn classic_grammar_round_trips(
            token in any::<i64>(),
            tracetime in 0.0_f64..100_000.0,
            pid in any::<i32>(),
            tid in any::<i32>(),
            level in prop::sample::select(vec!['V', 'D', 'I', 'W', 'E', 'F']),
            tag in "[A-Za-z][A-Za-z0-9_]{0,15}",
            payload in "[A-Za-z0-9 _.,=-]{0,40}",
        ) {
            let boot_id = "6b798b8c-68a2-4c6a-9e1a-123456789abc";
            let raw = classic_line(boot_id, token, tracetime, pid, tid, level, &tag, &payload);
            let parsed = parse_logline(&raw).expect("generated line is grammar-valid");
            prop_assert_eq!(&parsed.raw, &raw);
            prop_assert_eq!(parsed.boot_id, boot_id);
            prop_assert_eq!(parsed.logcat_token, token);
            prop_assert_eq!(parsed.pid, pid);
            prop_assert_eq!(parsed.tid, tid);
            prop_assert_eq!(parsed.level, level);
            prop_assert_eq!(parsed.tag, tag);
        }

        /// P1: ordering is total and consistent with a strict-less-than on
        /// `(boot_id, logcat_token, tracetime)` regardless of field values.
        #[test]
        fn cmp_order_is_consistent_with_key_tuple(
            token_a in any::<i64>(),
            token_b in any::<i64>(),
            tracetime_a in 0.0_f64..100_000.0,
            tracetime_b in 0.0_f64..100_000.0,
        ) {
            let boot_id = "6b798b8c-68a2-4c6a-9e1a-123456789abc";
            let mut a = parse_logline(&classic_line(boot_id, token_a, tracetime_a, 1, 1, 'D', "Tag", "x"))
                .expect("a parses");
            let b = parse_logline(&classic_line(boot_id, token_b, tracetime_b, 1, 1, 'D', "Tag", "x"))
                .expect("b parses");
            a.boot_id = b.boot_id.clone();

            let expected = token_a
                .cmp(&token_b)
                .then_with(|| tracetime_a.partial_cmp(&tracetime_b).expect("finite"));
            prop_assert_eq!(cmp_order(&a, &b), expected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_classic_ctx_switch_line() {
        let raw = "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 11553177 [29981.752359]   202   203 D Kernel-Trace:      kworker/1:1-21588 [001] ...2 29981.751893: phonelab_periodic_ctx_switch_info: cpu=1 pid=7641 tgid=7613 nice=0 comm=Binder_1 utime=0 stime=0 rtime=158906 bg_utime=0 bg_stime=0 bg_rtime=0 s_run=0 s_int=2 s_unint=0 s_oth=0 log_idx=79981";
        let line = parse_logline(raw).expect("line parses");
        assert_eq!(line.boot_id, "6b798b8c-68a2-4c6a-9e1a-123456789abc");
        assert_eq!(line.datetime_nanos, 199_025_638);
        assert_eq!(line.logcat_token, 11_553_177);
        assert!((line.tracetime - 29981.752_359).abs() < 1e-9);
        assert_eq!(line.pid, 202);
        assert_eq!(line.tid, 203);
        assert_eq!(line.level, 'D');
        assert_eq!(line.tag, "Kernel-Trace");
    }

    #[test]
    fn rejects_garbage_line() {
        assert!(parse_logline("not a log line at all").is_none());
    }

    #[test]
    fn ordering_is_boot_then_token_then_tracetime() {
        let mut a = parse_logline(
            "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 1 202 203 D Tag: x",
        )
        .expect("a parses");
        let mut b = a.clone();
        b.logcat_token = 2;
        assert_eq!(cmp_order(&a, &b), Ordering::Less);

        b.logcat_token = a.logcat_token;
        b.tracetime = a.tracetime + 1.0;
        assert_eq!(cmp_order(&a, &b), Ordering::Less);

        a.boot_id = "0000000000000000000000000000000000".to_owned();
        b.boot_id = "ffffffffffffffffffffffffffffffffffff"
            .chars()
            .take(36)
            .collect();
        assert_eq!(cmp_order(&a, &b), Ordering::Less);
    }
}
