//! Foreground/background snapshot tracker (spec §4.7), opaque side-channel
//! state consumed by the temp/battery correlator.

use crate::parser::trace::{parse_trace_event, TraceEvent};
use crate::parser::LogLine;

/// A snapshot of the most recently observed foreground process.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FgBgState {
    pub foreground_pid: i32,
    pub foreground_tgid: i32,
    pub foreground_comm: String,
}

#[derive(Default)]
pub struct FgBgTracker {
    state: FgBgState,
}

impl FgBgTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> FgBgState {
        self.state.clone()
    }

    /// Observational tracker stage: always returns `true`.
    pub fn observe(&mut self, line: &LogLine) -> bool {
        if let Some((_, TraceEvent::PhonelabProcForeground(fg))) = parse_trace_event(line) {
            self.state = FgBgState {
                foreground_pid: fg.pid,
                foreground_tgid: fg.tgid,
                foreground_comm: fg.comm,
            };
        }
        true
    }
}
