//! Filter pipeline (C7): a composable set of per-line stateful
//! filters/trackers. A `LoglineFilter` is observational (always returns
//! `true`, driving a tracker callback) or selective (a gate that may
//! suppress delivery); a `Filter` runs its closures in order with
//! short-circuit AND (spec §4.7).

pub mod cpu_tracker;
pub mod ctx_switch_tracker;
pub mod day_filter;
pub mod fgbg_tracker;
pub mod foreground;
pub mod sleep_filter;

pub use cpu_tracker::CpuTracker;
pub use ctx_switch_tracker::PeriodicCtxSwitchInfoTracker;
pub use day_filter::DayFilter;
pub use fgbg_tracker::{FgBgState, FgBgTracker};
pub use foreground::ForegroundGate;
pub use sleep_filter::SleepFilter;

use crate::parser::LogLine;

/// One filter/tracker stage: `true` to let the line continue through the
/// pipeline, `false` to suppress it.
pub type LoglineFilter = Box<dyn Fn(&LogLine) -> bool + Send>;

/// An ordered chain of [`LoglineFilter`]s, applied in registration order
/// with short-circuit AND. This is the composition point C7 describes:
/// `Boot::stream` takes one of these rather than a bare stage vector.
#[derive(Default)]
pub struct Filter {
    stages: Vec<LoglineFilter>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: LoglineFilter) {
        self.stages.push(filter);
    }

    /// Run every stage over an already-parsed line; `true` iff every stage
    /// passes, short-circuiting on the first `false`.
    #[must_use]
    pub fn passes(&self, line: &LogLine) -> bool {
        self.stages.iter().all(|stage| stage(line))
    }

    /// Parse `raw` (dropping it if unparseable), then run every stage in
    /// order; `true` iff every stage passes.
    #[must_use]
    pub fn apply(&self, raw: &str) -> Option<bool> {
        let line = crate::parser::parse_logline(raw)?;
        Some(self.passes(&line))
    }
}
