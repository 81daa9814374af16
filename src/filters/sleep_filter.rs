//! Sleep/suspend gate (spec §4.7). Reacts only to `KernelPrintk` suspend
//! markers; gates every other line by whether the current suspend state
//! intersects a configured mask.

use crate::parser::printk::{parse_printk_event, PrintkEvent, SuspendState as PrintkSuspendState};
use crate::parser::LogLine;

pub const UNKNOWN: u8 = 1;
pub const SUSPENDED: u8 = 2;
pub const AWAKE: u8 = 4;

type SuspendCallback = Box<dyn FnMut(&LogLine) + Send>;

pub struct SleepFilter {
    current_state: u8,
    filter_state: u8,
    exclusive: bool,
    entry_callback: Option<SuspendCallback>,
    exit_callback: Option<SuspendCallback>,
    last_entry: Option<LogLine>,
}

impl Default for SleepFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepFilter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_state: AWAKE,
            filter_state: AWAKE,
            exclusive: false,
            entry_callback: None,
            exit_callback: None,
            last_entry: None,
        }
    }

    #[must_use]
    pub fn with_filter_state(mut self, filter_state: u8) -> Self {
        self.filter_state = filter_state;
        self
    }

    #[must_use]
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn on_entry(&mut self, callback: impl FnMut(&LogLine) + Send + 'static) {
        self.entry_callback = Some(Box::new(callback));
    }

    pub fn on_exit(&mut self, callback: impl FnMut(&LogLine) + Send + 'static) {
        self.exit_callback = Some(Box::new(callback));
    }

    #[must_use]
    pub fn current_state(&self) -> u8 {
        self.current_state
    }

    /// Gate stage: `exclusive` passes only suspend marker lines themselves;
    /// otherwise passes lines whose current state intersects `filter_state`.
    pub fn observe(&mut self, line: &LogLine) -> bool {
        let event = parse_printk_event(line);
        let is_marker = matches!(event, Some(PrintkEvent::PowerManagement(_)));

        if let Some(PrintkEvent::PowerManagement(pm)) = event {
            match pm.state {
                PrintkSuspendState::SuspendEntry => {
                    self.current_state = SUSPENDED;
                    self.last_entry = Some(line.clone());
                    if let Some(cb) = &mut self.entry_callback {
                        cb(line);
                    }
                }
                PrintkSuspendState::SuspendExit => {
                    if self.last_entry.is_none() {
                        log::warn!("suspend-exit without a preceding suspend-entry");
                    }
                    self.current_state = AWAKE;
                    if let Some(cb) = &mut self.exit_callback {
                        cb(line);
                    }
                }
            }
        }

        if self.exclusive {
            is_marker
        } else {
            self.current_state & self.filter_state != 0
        }
    }
}
