//! Analysis harness (C8): bounded fan-out over devices × boots feeding the
//! filter pipeline, plus a reusable early-exit latch for consumers like a
//! PVS scan that only need one match per device.

pub mod temp_battery;

use crate::config::{AnalysisConfig, BOOT_CONCURRENCY, DEVICE_CONCURRENCY};
use crate::manifest::Manifest;
use rayon::prelude::*;
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static DEVICE_DIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("static device-dir pattern is valid"));

/// Enumerate `<root>/*/` directories whose name is a 40-character
/// lowercase-hex device id (spec §4.8, supplemented from
/// `post_processing/common.go`'s `GetDevices`).
pub fn enumerate_devices(root: &Path) -> std::io::Result<Vec<String>> {
    let mut devices = Vec::new();
    if !root.is_dir() {
        return Ok(devices);
    }
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if DEVICE_DIR_PATTERN.is_match(name) {
                devices.push(name.to_owned());
            }
        }
    }
    devices.sort();
    Ok(devices)
}

/// A per-device "found" latch (spec §5): once closed, every boot consumer
/// for that device must stop emitting results and unwind promptly.
#[derive(Clone, Default)]
pub struct FoundLatch {
    closed: Arc<AtomicBool>,
}

impl FoundLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Run `per_boot(device_id, boot_id)` over every (device, boot) pair under
/// `config.root`, honoring `config`'s device allow-list. Concurrency is
/// capped at `DEVICE_CONCURRENCY` devices and `BOOT_CONCURRENCY` boots per
/// device — fixed design constants (spec §5), not configurable.
///
/// # Errors
/// Returns an I/O error only if the root directory cannot be listed.
pub fn run_harness<R, F>(config: &AnalysisConfig, per_boot: F) -> std::io::Result<Vec<R>>
where
    R: Send,
    F: Fn(&str, &str) -> R + Sync,
{
    let devices: Vec<String> = enumerate_devices(&config.root)?
        .into_iter()
        .filter(|d| config.wants_device(d))
        .collect();

    let device_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(DEVICE_CONCURRENCY)
        .build()
        .expect("device thread pool builds");

    let results = device_pool.install(|| {
        devices
            .par_iter()
            .flat_map(|device_id| {
                let device_dir = config.root.join(device_id);
                let manifest = Manifest::read(&device_dir).unwrap_or_default();

                let boot_pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(BOOT_CONCURRENCY)
                    .build()
                    .expect("boot thread pool builds");

                boot_pool.install(|| {
                    manifest
                        .bootids
                        .par_iter()
                        .map(|boot_id| per_boot(device_id, boot_id))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>()
    });

    Ok(results)
}
