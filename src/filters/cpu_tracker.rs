//! CPU frequency/hotplug tracker (spec §4.7). The callback fires *before*
//! internal state advances, so callers observe the prior state and can
//! account duration spent there.

use crate::parser::trace::{parse_trace_event, CpuFrequency, SchedCpuHotplug, TraceEvent};
use crate::parser::LogLine;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CpuState {
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CpuEntry {
    pub state: CpuState,
    pub frequency: Option<i64>,
    pub freq_logline: Option<LogLine>,
    pub state_logline: Option<LogLine>,
}

impl Default for CpuEntry {
    fn default() -> Self {
        Self {
            state: CpuState::Unknown,
            frequency: None,
            freq_logline: None,
            state_logline: None,
        }
    }
}

/// What the callback observes: the event that triggered this update, and
/// the CPU it concerns.
pub enum CpuTrackerEvent<'a> {
    Frequency(&'a CpuFrequency),
    Hotplug(&'a SchedCpuHotplug),
}

pub struct CpuTracker {
    states: HashMap<u32, CpuEntry>,
    callback: Option<Box<dyn FnMut(CpuTrackerEvent<'_>, u32, &CpuEntry) + Send>>,
}

impl Default for CpuTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            callback: None,
        }
    }

    pub fn on_update(
        &mut self,
        callback: impl FnMut(CpuTrackerEvent<'_>, u32, &CpuEntry) + Send + 'static,
    ) {
        self.callback = Some(Box::new(callback));
    }

    #[must_use]
    pub fn state_of(&self, cpu: u32) -> Option<&CpuEntry> {
        self.states.get(&cpu)
    }

    /// Deep-copy snapshot of every tracked CPU's state, used by the
    /// temp/battery chunker to stamp a chunk's `Start` state.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<u32, CpuEntry> {
        self.states.clone()
    }

    /// Observational tracker stage: always returns `true`.
    pub fn observe(&mut self, line: &LogLine) -> bool {
        let Some((_, event)) = parse_trace_event(line) else {
            return true;
        };
        match event {
            TraceEvent::CpuFrequency(freq) => self.on_cpu_frequency(&freq, line),
            TraceEvent::SchedCpuHotplug(hotplug) => self.on_hotplug(&hotplug, line),
            _ => {}
        }
        true
    }

    fn on_cpu_frequency(&mut self, freq: &CpuFrequency, line: &LogLine) {
        let entry = self.states.entry(freq.cpu_id).or_default();
        if let Some(cb) = &mut self.callback {
            cb(CpuTrackerEvent::Frequency(freq), freq.cpu_id, entry);
        }
        let entry = self.states.entry(freq.cpu_id).or_default();
        entry.state = CpuState::Online;
        entry.frequency = Some(freq.state);
        entry.freq_logline = Some(line.clone());
    }

    fn on_hotplug(&mut self, hotplug: &SchedCpuHotplug, line: &LogLine) {
        let entry = self.states.entry(hotplug.cpu).or_default();
        if let Some(cb) = &mut self.callback {
            cb(CpuTrackerEvent::Hotplug(hotplug), hotplug.cpu, entry);
        }
        let entry = self.states.entry(hotplug.cpu).or_default();
        if hotplug.error == 0 {
            match hotplug.state.as_str() {
                "online" => entry.state = CpuState::Online,
                "offline" => entry.state = CpuState::Offline,
                _ => {}
            }
            entry.state_logline = Some(line.clone());
        }
    }
}
