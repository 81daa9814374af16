/// logshard - An incremental logcat/kernel-trace stitcher
///
/// Copyright (C) 2025 Daniel Freiermuth
///
/// This program is free software: you can redistribute it and/or modify
/// it under the terms of the GNU General Public License as published by
/// the Free Software Foundation, either version 3 of the License, or
/// (at your option) any later version.
///
/// This program is distributed in the hope that it will be useful,
/// but WITHOUT ANY WARRANTY; without even the implied warranty of
/// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
/// GNU General Public License for more details.
///
/// You should have received a copy of the GNU General Public License
/// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use anyhow::Context;
use clap::Parser;
use logshard::config::{Args, Config};
use logshard::stitch;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::from(args);
    log::info!(
        "stitching {} with patterns {:?}",
        config.root.display(),
        config.globs
    );

    let manifest = stitch::run(&config)
        .with_context(|| format!("stitch failed for {}", config.root.display()))?;

    log::info!(
        "stitch complete: {} files, {} boots",
        manifest.files.len(),
        manifest.bootids.len()
    );
    Ok(())
}
