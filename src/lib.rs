// logshard - GPL-3.0-or-later
// This file is part of logshard.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// logshard is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// logshard is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with logshard.  If not, see <https://www.gnu.org/licenses/>.

//! Incremental logcat/kernel-trace stitcher: parses raw Android logcat and
//! ftrace dumps, external-sorts them into per-boot order, and shards each
//! boot into resumable gzip files under a device/boot directory tree. A
//! analysis harness and a library of boot-stream trackers (CPU hotplug,
//! sleep state, foreground process, temp/battery correlation) build on top
//! of the shard tree for offline analysis.

pub mod analysis;
pub mod boot;
pub mod config;
pub mod error;
pub mod filters;
pub mod gzip_io;
pub mod manifest;
pub mod merge;
pub mod parser;
pub mod sort;
pub mod split;
pub mod stitch;
