// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Watchtower CLI entrypoint.
//!
//! By default this runs the interactive dashboard. Configuration is read
//! from `~/.config/watchtower/config.yaml` unless `--config` points
//! elsewhere; missing files fall back to built-in defaults.

use std::error::Error;
use std::path::PathBuf;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <path>] [--refresh <secs>]\n  {program} --clear-brief-cache\n\n--config <path> reads configuration from <path> instead of the default\n`~/.config/watchtower/config.yaml`.\n--refresh <secs> overrides the auto-refresh interval for this run.\n--clear-brief-cache deletes the cached AI brief and exits."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: Option<PathBuf>,
    refresh_secs: Option<u64>,
    clear_brief_cache: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if options.config_path.is_some() {
                    return Err(());
                }
                let path = args.next().ok_or(())?;
                options.config_path = Some(PathBuf::from(path));
            }
            "--refresh" => {
                if options.refresh_secs.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let secs: u64 = raw.parse().map_err(|_| ())?;
                if secs == 0 {
                    return Err(());
                }
                options.refresh_secs = Some(secs);
            }
            "--clear-brief-cache" => {
                if options.clear_brief_cache {
                    return Err(());
                }
                options.clear_brief_cache = true;
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "watchtower".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        if options.clear_brief_cache {
            match watchtower::intel::cache::BriefCache::default_location() {
                Some(cache) => {
                    cache.clear()?;
                    println!("cleared brief cache at {}", cache.path().display());
                }
                None => eprintln!("no cache directory available on this platform"),
            }
            return Ok(());
        }

        let mut cfg = match &options.config_path {
            Some(path) => watchtower::config::load_from(path)?,
            None => watchtower::config::load()?,
        };
        if let Some(secs) = options.refresh_secs {
            cfg.refresh_secs = secs;
        }

        watchtower::tui::run(cfg)
    })();

    if let Err(err) = result {
        eprintln!("watchtower: {err}");
        std::process::exit(1);
    }
}
