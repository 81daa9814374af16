//! Per-day tick (spec §4.7): fires a callback whenever the calendar day
//! changes, rebasing to the triggering line. Always returns `true` — a
//! pure observation, never a gate.

use crate::parser::LogLine;
use chrono::Datelike;

type DayChangeCallback = Box<dyn FnMut(&LogLine) + Send>;

pub struct DayFilter {
    day_start: Option<LogLine>,
    callback: Option<DayChangeCallback>,
}

impl Default for DayFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DayFilter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            day_start: None,
            callback: None,
        }
    }

    pub fn on_day_change(&mut self, callback: impl FnMut(&LogLine) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn observe(&mut self, line: &LogLine) -> bool {
        match &self.day_start {
            None => self.day_start = Some(line.clone()),
            Some(start) if start.datetime.ordinal() != line.datetime.ordinal() => {
                if let Some(cb) = &mut self.callback {
                    cb(line);
                }
                self.day_start = Some(line.clone());
            }
            Some(_) => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_logline;

    fn line(date: &str, token: i64) -> LogLine {
        let raw = format!("6b798b8c-68a2-4c6a-9e1a-123456789abc {date} 09:59:01.199025638 {token} 202 203 D Tag: x");
        parse_logline(&raw).expect("line parses")
    }

    #[test]
    fn fires_only_on_day_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let fires = Arc::new(AtomicUsize::new(0));
        let fires_clone = Arc::clone(&fires);
        let mut filter = DayFilter::new();
        filter.on_day_change(move |_| {
            fires_clone.fetch_add(1, Ordering::SeqCst);
        });

        filter.observe(&line("2016-04-21", 1));
        filter.observe(&line("2016-04-21", 2));
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        filter.observe(&line("2016-04-22", 3));
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }
}
