//! Stitcher orchestration: wires C1–C5 into the full incremental pipeline
//! described in spec §4 — parse+sort each new file in parallel, n-way
//! merge, boot-split, then commit the manifest.

use crate::config::Config;
use crate::error::StitchError;
use crate::manifest::Manifest;
use crate::merge::NWayMerge;
use crate::sort;
use crate::split::split_into_boots;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};

fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    Regex::new(&out).expect("glob-derived pattern is always a valid regex")
}

fn discover_input_files(root: &Path, globs: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let patterns: Vec<Regex> = globs.iter().map(|g| glob_to_regex(g)).collect();
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if patterns.iter().any(|p| p.is_match(&name)) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// Run one full stitch over `config.root`. Returns the final manifest.
///
/// # Errors
/// Propagates fatal spill/shard/manifest I/O errors (spec §7); a bad
/// *source* file is logged and skipped rather than surfaced here.
pub fn run(config: &Config) -> Result<Manifest, StitchError> {
    let mut manifest = Manifest::read(&config.root).map_err(|source| StitchError::ManifestRead {
        path: config.root.join("info.json"),
        source,
    })?;

    let delete_first = manifest.delete_first && !config.split_only;

    let run_paths: Vec<PathBuf> = if config.split_only {
        existing_chunk_runs(&config.root)?
    } else {
        let candidates = discover_input_files(&config.root, &config.globs)
            .map_err(|source| StitchError::ShardWrite {
                path: config.root.clone(),
                source,
            })?;
        let new_files: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|f| !manifest.has_file(f))
            .collect();

        let sorted: Vec<(PathBuf, Vec<PathBuf>)> = new_files
            .par_iter()
            .filter_map(|file| match sort::external_sort(file, config.bufsize) {
                Ok(runs) => Some((file.clone(), runs)),
                Err(err) => {
                    log::error!("skipping unreadable source file {}: {err}", file.display());
                    None
                }
            })
            .collect();

        let mut runs = Vec::new();
        for (file, file_runs) in sorted {
            manifest.record_file(file);
            runs.extend(file_runs);
        }
        runs
    };

    let merged = NWayMerge::open(&run_paths).map_err(|source| StitchError::SpillWrite {
        path: config.root.clone(),
        source,
    })?;

    let delete_first = if config.split_only { true } else { delete_first };
    let bootids = split_into_boots(merged, &config.root, delete_first)?;
    for bootid in bootids {
        manifest.record_bootid(bootid);
    }

    if config.delete_intermediate {
        for run in &run_paths {
            let _ = std::fs::remove_file(run);
        }
    }

    manifest
        .write(&config.root)
        .map_err(|source| StitchError::ManifestWrite {
            path: config.root.join("info.json"),
            source,
        })?;

    Ok(manifest)
}

fn existing_chunk_runs(root: &Path) -> Result<Vec<PathBuf>, StitchError> {
    let mut runs = Vec::new();
    let entries = std::fs::read_dir(root).map_err(|source| StitchError::ShardWrite {
        path: root.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| StitchError::ShardWrite {
            path: root.to_path_buf(),
            source,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            if name.contains("chunk") && name.ends_with(".gz") {
                runs.push(entry.path());
            }
        }
    }
    runs.sort();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gzip_io;
    use std::io::Write as _;

    fn write_source(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = gzip_io::create_gz_writer(&path).expect("writer");
        for line in lines {
            writeln!(writer, "{line}").expect("write");
        }
        gzip_io::finish_gz_writer(writer).expect("finish");
        path
    }

    #[test]
    fn stitches_a_single_file_into_one_boot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let boot = "6b798b8c-68a2-4c6a-9e1a-123456789abc";
        write_source(
            dir.path(),
            "a.out.gz",
            &[
                &format!("{boot} 2016-04-21 09:59:01.199025638 2 202 203 D Tag: two"),
                &format!("{boot} 2016-04-21 09:59:01.199025638 1 202 203 D Tag: one"),
            ],
        );

        let config = Config {
            root: dir.path().to_path_buf(),
            globs: vec!["*.out.gz".to_owned()],
            bufsize: 10 * 1024 * 1024,
            split_only: false,
            delete_intermediate: true,
        };

        let manifest = run(&config).expect("stitch runs");
        assert!(manifest.bootids.contains(boot));

        let shard = dir.path().join(boot).join("00000000.gz");
        assert!(shard.exists());
    }

    #[test]
    fn incremental_rerun_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let boot = "6b798b8c-68a2-4c6a-9e1a-123456789abc";
        write_source(
            dir.path(),
            "a.out.gz",
            &[&format!(
                "{boot} 2016-04-21 09:59:01.199025638 1 202 203 D Tag: one"
            )],
        );

        let config = Config {
            root: dir.path().to_path_buf(),
            globs: vec!["*.out.gz".to_owned()],
            bufsize: 10 * 1024 * 1024,
            split_only: false,
            delete_intermediate: true,
        };

        run(&config).expect("first run");
        let shard = dir.path().join(boot).join("00000000.gz");
        let before = std::fs::read(&shard).expect("read shard");

        run(&config).expect("second run");
        let after = std::fs::read(&shard).expect("read shard again");
        assert_eq!(before, after);
        assert!(!dir.path().join(boot).join("00000001.gz").exists());
    }
}
