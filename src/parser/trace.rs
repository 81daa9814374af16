//! Kernel-trace payload grammar and the `TraceEvent` tagged sum (spec §3,
//! §4.1, §6). Extracted from a `LogLine` whose tag is `Kernel-Trace`.

use super::line::LogLine;
use regex::Regex;
use std::sync::LazyLock;

static TRACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<thread>\S+)\s+
        \[(?P<cpu>\d+)\]\s+
        (?P<flags>\S{4})\s+
        (?P<timestamp>\d+\.\d+):\s+
        (?P<tag>\S+):\s*
        (?P<text>.*)$
        ",
    )
    .expect("static trace pattern is valid")
});

/// Fields shared by every trace event; `line` fields are copied rather than
/// borrowed so trackers can own a `Trace` independent of the source
/// `LogLine`'s lifetime (spec §9, cyclic-reference design note).
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEnvelope {
    pub thread: String,
    pub cpu: u32,
    pub flags: String,
    pub kernel_timestamp: f64,
    pub tag: String,
    pub logcat_token: i64,
    pub tracetime: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedCpuHotplug {
    pub cpu: u32,
    pub state: String,
    pub error: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThermalTemp {
    pub sensor_id: i32,
    pub temp: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuFrequency {
    pub cpu_id: u32,
    pub state: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhonelabNumOnlineCpus {
    pub num_online_cpus: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhonelabProcForeground {
    pub pid: i32,
    pub tgid: i32,
    pub comm: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    Begin,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhonelabPeriodicCtxSwitchMarker {
    pub state: MarkerState,
    pub cpu: u32,
    pub count: i64,
    pub log_idx: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhonelabPeriodicCtxSwitchInfo {
    pub cpu: u32,
    pub pid: i32,
    pub tgid: i32,
    pub nice: i32,
    pub comm: String,
    pub utime: i64,
    pub stime: i64,
    pub rtime: i64,
    pub bg_utime: i64,
    pub bg_stime: i64,
    pub bg_rtime: i64,
    pub s_run: i64,
    pub s_int: i64,
    pub s_unint: i64,
    pub s_oth: i64,
    pub log_idx: i64,
    pub rx: i64,
    pub tx: i64,
}

/// Closed set of recognized kernel-trace events. Unrecognized tags yield
/// `None` from [`parse_trace_event`], never a catch-all variant (spec §9,
/// "dynamic dispatch over events" design note: tagged sum, not runtime tag
/// strings).
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    SchedCpuHotplug(SchedCpuHotplug),
    ThermalTemp(ThermalTemp),
    CpuFrequency(CpuFrequency),
    PhonelabNumOnlineCpus(PhonelabNumOnlineCpus),
    PhonelabProcForeground(PhonelabProcForeground),
    PhonelabPeriodicCtxSwitchMarker(PhonelabPeriodicCtxSwitchMarker),
    PhonelabPeriodicCtxSwitchInfo(PhonelabPeriodicCtxSwitchInfo),
}

fn kv_map(text: &str) -> std::collections::HashMap<&str, &str> {
    text.split_whitespace()
        .filter_map(|tok| tok.split_once('='))
        .collect()
}

/// Parse a `LogLine`'s payload into `(envelope, event)` if it is a
/// well-formed kernel-trace record with a recognized tag. Returns `None`
/// (but the `LogLine` itself still stands) on any parse miss — per spec
/// §4.1, payload parsing never discards the line.
#[must_use]
pub fn parse_trace_event(line: &LogLine) -> Option<(TraceEnvelope, TraceEvent)> {
    if line.tag != "Kernel-Trace" {
        return None;
    }
    let caps = TRACE_PATTERN.captures(&line.payload)?;
    let tag = caps.name("tag")?.as_str().to_owned();
    let cpu: u32 = caps.name("cpu")?.as_str().parse().ok()?;
    let envelope = TraceEnvelope {
        thread: caps.name("thread")?.as_str().to_owned(),
        cpu,
        flags: caps.name("flags")?.as_str().to_owned(),
        kernel_timestamp: caps.name("timestamp")?.as_str().parse().ok()?,
        tag: tag.clone(),
        logcat_token: line.logcat_token,
        tracetime: line.tracetime,
    };
    let text = caps.name("text")?.as_str();
    let event = parse_event_text(&tag, cpu, text)?;
    Some((envelope, event))
}

fn parse_event_text(tag: &str, cpu: u32, text: &str) -> Option<TraceEvent> {
    let kv = kv_map(text);
    match tag {
        "sched_cpu_hotplug" => {
            let cpu: u32 = first_token_int(text)?;
            let state = second_token(text)?.to_owned();
            let error: i32 = kv.get("error")?.parse().ok()?;
            Some(TraceEvent::SchedCpuHotplug(SchedCpuHotplug {
                cpu,
                state,
                error,
            }))
        }
        "thermal_temp" => Some(TraceEvent::ThermalTemp(ThermalTemp {
            sensor_id: kv.get("sensor_id")?.parse().ok()?,
            temp: kv.get("temp")?.parse().ok()?,
        })),
        "cpu_frequency" => Some(TraceEvent::CpuFrequency(CpuFrequency {
            cpu_id: kv.get("cpu_id")?.parse().ok()?,
            state: kv.get("state")?.parse().ok()?,
        })),
        "phonelab_num_online_cpus" => {
            Some(TraceEvent::PhonelabNumOnlineCpus(PhonelabNumOnlineCpus {
                num_online_cpus: kv.get("num_online_cpus")?.parse().ok()?,
            }))
        }
        "phonelab_proc_foreground" => {
            Some(TraceEvent::PhonelabProcForeground(PhonelabProcForeground {
                pid: kv.get("pid")?.parse().ok()?,
                tgid: kv.get("tgid")?.parse().ok()?,
                comm: (*kv.get("comm")?).to_owned(),
            }))
        }
        "phonelab_periodic_ctx_switch_marker" => {
            let state = if text.trim_start().starts_with("BEGIN") {
                MarkerState::Begin
            } else if text.trim_start().starts_with("END") {
                MarkerState::End
            } else {
                return None;
            };
            Some(TraceEvent::PhonelabPeriodicCtxSwitchMarker(
                PhonelabPeriodicCtxSwitchMarker {
                    state,
                    cpu,
                    count: kv.get("count")?.parse().ok()?,
                    log_idx: kv.get("log_idx")?.parse().ok()?,
                },
            ))
        }
        "phonelab_periodic_ctx_switch_info" => Some(TraceEvent::PhonelabPeriodicCtxSwitchInfo(
            PhonelabPeriodicCtxSwitchInfo {
                cpu: kv.get("cpu")?.parse().ok()?,
                pid: kv.get("pid")?.parse().ok()?,
                tgid: kv.get("tgid")?.parse().ok()?,
                nice: kv.get("nice")?.parse().ok()?,
                comm: (*kv.get("comm")?).to_owned(),
                utime: kv.get("utime")?.parse().ok()?,
                stime: kv.get("stime")?.parse().ok()?,
                rtime: kv.get("rtime")?.parse().ok()?,
                bg_utime: kv.get("bg_utime")?.parse().ok()?,
                bg_stime: kv.get("bg_stime")?.parse().ok()?,
                bg_rtime: kv.get("bg_rtime")?.parse().ok()?,
                s_run: kv.get("s_run")?.parse().ok()?,
                s_int: kv.get("s_int")?.parse().ok()?,
                s_unint: kv.get("s_unint")?.parse().ok()?,
                s_oth: kv.get("s_oth")?.parse().ok()?,
                log_idx: kv.get("log_idx")?.parse().ok()?,
                rx: kv.get("rx").and_then(|v| v.parse().ok()).unwrap_or(0),
                tx: kv.get("tx").and_then(|v| v.parse().ok()).unwrap_or(0),
            },
        )),
        _ => None,
    }
}

fn first_token_int(text: &str) -> Option<u32> {
    // "cpu <int> <state-word> error=<signed-int>"
    text.split_whitespace().nth(1)?.parse().ok()
}

fn second_token(text: &str) -> Option<&str> {
    text.split_whitespace().nth(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::line::parse_logline;

    fn kernel_trace_line(payload: &str) -> LogLine {
        let raw = format!(
            "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 11553177 [29981.752359]   202   203 D Kernel-Trace: {payload}"
        );
        parse_logline(&raw).expect("line parses")
    }

    #[test]
    fn parses_periodic_ctx_switch_info() {
        let line = kernel_trace_line(
            "kworker/1:1-21588 [001] ...2 29981.751893: phonelab_periodic_ctx_switch_info: cpu=1 pid=7641 tgid=7613 nice=0 comm=Binder_1 utime=0 stime=0 rtime=158906 bg_utime=0 bg_stime=0 bg_rtime=0 s_run=0 s_int=2 s_unint=0 s_oth=0 log_idx=79981",
        );
        let (envelope, event) = parse_trace_event(&line).expect("trace parses");
        assert_eq!(envelope.cpu, 1);
        match event {
            TraceEvent::PhonelabPeriodicCtxSwitchInfo(info) => {
                assert_eq!(info.rtime, 158_906);
                assert_eq!(info.rx, 0);
                assert_eq!(info.tx, 0);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_tag_yields_no_event() {
        let line = kernel_trace_line("kworker/1:1-1 [000] ...2 1.0: some_unknown_tag: text here");
        assert!(parse_trace_event(&line).is_none());
    }
}
