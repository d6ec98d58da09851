// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use console::{Style, style};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Prints log records to stderr, colored by level.
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl ConsoleLogger {
    /// Install the logger. `verbosity` counts `-v` flags: none shows
    /// warnings, one adds debug records and two or more add traces.
    pub fn install(verbosity: u8) -> Result<(), log::SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
        Ok(())
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => Style::new().red().bold(),
        Level::Warn => Style::new().yellow(),
        Level::Info => Style::new().cyan(),
        Level::Debug => Style::new().blue(),
        Level::Trace => Style::new().dim(),
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = record.level();
        eprintln!(
            "{} {} {}",
            level_style(level).apply_to(format!("{level:>5}")),
            style(record.target()).dim(),
            record.args()
        );
    }

    fn flush(&self) {}
}
