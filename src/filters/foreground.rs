//! Foreground gate (spec §4.7): tracks the most recently announced
//! foreground pid and passes a line iff a foreground process is known.

use crate::parser::trace::{parse_trace_event, TraceEvent};
use crate::parser::LogLine;

pub struct ForegroundGate {
    foreground_pid: i32,
}

impl Default for ForegroundGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundGate {
    #[must_use]
    pub fn new() -> Self {
        Self { foreground_pid: 0 }
    }

    #[must_use]
    pub fn foreground_pid(&self) -> i32 {
        self.foreground_pid
    }

    /// Gate stage: `true` iff a nonzero foreground pid is currently known.
    pub fn observe(&mut self, line: &LogLine) -> bool {
        if let Some((_, TraceEvent::PhonelabProcForeground(fg))) = parse_trace_event(line) {
            self.foreground_pid = fg.pid;
        }
        self.foreground_pid != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_logline;

    fn fg_line(pid: i32) -> LogLine {
        let raw = format!(
            "6b798b8c-68a2-4c6a-9e1a-123456789abc 2016-04-21 09:59:01.199025638 1 202 203 D Kernel-Trace: kworker/1:1-1 [000] ...2 1.0: phonelab_proc_foreground: pid={pid} tgid={pid} comm=app"
        );
        parse_logline(&raw).expect("line parses")
    }

    #[test]
    fn passes_only_once_foreground_pid_is_nonzero() {
        let mut gate = ForegroundGate::new();
        assert!(!gate.observe(&fg_line(0)));
        assert!(gate.observe(&fg_line(1234)));
        assert_eq!(gate.foreground_pid(), 1234);
    }
}
