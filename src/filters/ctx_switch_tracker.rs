//! Periodic context-switch aggregator (spec §4.7, P8). Accumulates
//! `phonelab_periodic_ctx_switch_info` records between a BEGIN/END marker
//! pair per CPU and reports derived busyness fractions.

use crate::parser::trace::{
    parse_trace_event, MarkerState, PhonelabPeriodicCtxSwitchInfo, PhonelabPeriodicCtxSwitchMarker,
    TraceEvent,
};
use crate::parser::LogLine;
use std::collections::HashMap;

/// One accumulated BEGIN..END window for a CPU.
#[derive(Debug, Clone)]
pub struct PeriodicCtxSwitchInfo {
    pub start: PhonelabPeriodicCtxSwitchMarker,
    pub info: Vec<PhonelabPeriodicCtxSwitchInfo>,
    pub end: Option<PhonelabPeriodicCtxSwitchMarker>,
}

impl PeriodicCtxSwitchInfo {
    /// Sum of `rtime` across every entry, `swapper` included — the
    /// denominator for all three busyness fractions (spec §4.7).
    #[must_use]
    pub fn total_time(&self) -> i64 {
        self.info.iter().map(|i| i.rtime).sum()
    }

    #[must_use]
    pub fn busyness(&self) -> f64 {
        let total = self.total_time();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let sum: i64 = self
            .info
            .iter()
            .filter(|i| !i.comm.contains("swapper"))
            .map(|i| i.rtime)
            .sum();
        sum as f64 / total as f64
    }

    #[must_use]
    pub fn fg_busyness(&self) -> f64 {
        let total = self.total_time();
        if total == 0 {
            return 0.0;
        }
        let sum: i64 = self
            .info
            .iter()
            .filter(|i| !i.comm.contains("swapper"))
            .map(|i| i.rtime - i.bg_rtime)
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let result = sum as f64 / total as f64;
        result
    }

    #[must_use]
    pub fn bg_busyness(&self) -> f64 {
        let total = self.total_time();
        if total == 0 {
            return 0.0;
        }
        let sum: i64 = self
            .info
            .iter()
            .filter(|i| !i.comm.contains("swapper"))
            .map(|i| i.bg_rtime)
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let result = sum as f64 / total as f64;
        result
    }
}

type CompletedCallback = Box<dyn FnMut(&PeriodicCtxSwitchInfo) + Send>;

#[derive(Default)]
pub struct PeriodicCtxSwitchInfoTracker {
    accumulators: HashMap<u32, PeriodicCtxSwitchInfo>,
    callback: Option<CompletedCallback>,
}

impl PeriodicCtxSwitchInfoTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_completed(&mut self, callback: impl FnMut(&PeriodicCtxSwitchInfo) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Observational tracker stage: always returns `true`.
    pub fn observe(&mut self, line: &LogLine) -> bool {
        let Some((_, event)) = parse_trace_event(line) else {
            return true;
        };
        match event {
            TraceEvent::PhonelabPeriodicCtxSwitchMarker(marker) => self.on_marker(marker),
            TraceEvent::PhonelabPeriodicCtxSwitchInfo(info) => self.on_info(info),
            _ => {}
        }
        true
    }

    fn on_marker(&mut self, marker: PhonelabPeriodicCtxSwitchMarker) {
        match marker.state {
            MarkerState::Begin => {
                self.accumulators.entry(marker.cpu).or_insert(PeriodicCtxSwitchInfo {
                    start: marker,
                    info: Vec::new(),
                    end: None,
                });
            }
            MarkerState::End => {
                if let Some(mut accumulator) = self.accumulators.remove(&marker.cpu) {
                    accumulator.end = Some(marker);
                    if let Some(cb) = &mut self.callback {
                        cb(&accumulator);
                    }
                }
            }
        }
    }

    fn on_info(&mut self, info: PhonelabPeriodicCtxSwitchInfo) {
        if let Some(accumulator) = self.accumulators.get_mut(&info.cpu) {
            accumulator.info.push(info);
        }
    }
}
