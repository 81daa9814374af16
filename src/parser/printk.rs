//! Kernel-printk grammar: `PrintkEvent` (spec §3). Parsed from `LogLine`s
//! tagged `KernelPrintk`, a sibling of [`super::trace::TraceEvent`] feeding
//! the sleep and temp/battery trackers.

use super::line::LogLine;
use regex::Regex;
use std::sync::LazyLock;

static MSM_THERMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"msm_thermal:\s+(?:(?P<online>Allow Online)|(?P<offline>Set Offline):?)\s*CPU(?P<cpu>\d+)\s+Temp:\s*(?P<temp>-?\d+)")
        .expect("static msm_thermal pattern is valid")
});

static HEALTHD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"healthd.*?\bl=(?P<level>\d+).*?\bchg=(?P<chg>\S*)")
        .expect("static healthd pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MsmThermal {
    pub state: CpuState,
    pub cpu: u32,
    pub temp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendState {
    SuspendEntry,
    SuspendExit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerManagement {
    pub state: SuspendState,
}

/// A battery-daemon sample. `charge` is empty when not charging and a
/// nonempty source indicator (e.g. `"a"`, `"u"`) when charging.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Healthd {
    pub level: i32,
    pub charge: String,
    pub line: LogLine,
}

impl Healthd {
    #[must_use]
    pub fn is_charging(&self) -> bool {
        !self.charge.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrintkEvent {
    MsmThermal(MsmThermal),
    PowerManagement(PowerManagement),
    Healthd(Healthd),
}

/// Parse a `KernelPrintk` line's payload into a [`PrintkEvent`], if
/// recognized. Unrecognized printk content yields `None`.
#[must_use]
pub fn parse_printk_event(line: &LogLine) -> Option<PrintkEvent> {
    if line.tag != "KernelPrintk" {
        return None;
    }
    if let Some(caps) = MSM_THERMAL_PATTERN.captures(&line.payload) {
        let state = if caps.name("online").is_some() {
            CpuState::Online
        } else {
            CpuState::Offline
        };
        return Some(PrintkEvent::MsmThermal(MsmThermal {
            state,
            cpu: caps.name("cpu")?.as_str().parse().ok()?,
            temp: caps.name("temp")?.as_str().parse().ok()?,
        }));
    }
    if line.payload.contains("PM: suspend entry") {
        return Some(PrintkEvent::PowerManagement(PowerManagement {
            state: SuspendState::SuspendEntry,
        }));
    }
    if line.payload.contains("PM: suspend exit") {
        return Some(PrintkEvent::PowerManagement(PowerManagement {
            state: SuspendState::SuspendExit,
        }));
    }
    if line.payload.contains("healthd") && line.payload.contains("chg") {
        if let Some(caps) = HEALTHD_PATTERN.captures(&line.payload) {
            return Some(PrintkEvent::Healthd(Healthd {
                level: caps.name("level")?.as_str().parse().ok()?,
                charge: caps.name("chg")?.as_str().to_owned(),
                line: line.clone(),
            }));
        }
    }
    None
}
