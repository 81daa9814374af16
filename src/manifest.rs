//! Manifest (C5): `<root>/info.json`, the directory-level record of every
//! ingested source file and every boot id materialized under `<root>`.
//! Mirrors the teacher's `GlobalConfig::load`/`save` JSON-file pattern.

use crate::error::ManifestError;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    bootids: Vec<String>,
}

/// A directory-level manifest. `delete_first` is derived, not stored: it is
/// true only when no manifest file was present to load (spec §4.5).
/// `files`/`bootids` are order-preserving sets so `write()` emits them in
/// insertion/union order rather than resorting them (spec §4.5, §3).
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub files: IndexSet<PathBuf>,
    pub bootids: IndexSet<String>,
    pub delete_first: bool,
}

fn manifest_path(root: &Path) -> PathBuf {
    root.join("info.json")
}

impl Manifest {
    /// Read `<root>/info.json`. A missing file yields an empty manifest
    /// with `delete_first = true`; any other error is returned.
    pub fn read(root: &Path) -> Result<Self, ManifestError> {
        let path = manifest_path(root);
        if !path.exists() {
            log::info!("no manifest at {}, starting fresh", path.display());
            return Ok(Self {
                delete_first: true,
                ..Self::default()
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let parsed: ManifestFile = serde_json::from_str(&contents)?;
        log::info!(
            "loaded manifest from {}: {} files, {} boots",
            path.display(),
            parsed.files.len(),
            parsed.bootids.len()
        );
        Ok(Self {
            files: parsed.files.into_iter().map(PathBuf::from).collect(),
            bootids: parsed.bootids.into_iter().collect(),
            delete_first: false,
        })
    }

    /// Write `<root>/info.json`, serializing the union of known files and
    /// boot ids as indented JSON with exactly the keys `files`/`bootids`.
    pub fn write(&self, root: &Path) -> Result<(), ManifestError> {
        let path = manifest_path(root);
        let on_disk = ManifestFile {
            files: self
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            bootids: self.bootids.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&on_disk)?;
        std::fs::write(&path, json)?;
        log::info!("wrote manifest to {}", path.display());
        Ok(())
    }

    /// True if `path` has already been ingested (skip re-sorting it).
    #[must_use]
    pub fn has_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn record_file(&mut self, path: PathBuf) {
        self.files.insert(path);
    }

    pub fn record_bootid(&mut self, bootid: String) {
        self.bootids.insert(bootid);
    }
}
