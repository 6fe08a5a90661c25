//! Log setup.
//!
//! Filtering follows `RUST_LOG` (e.g. `RUST_LOG=timetable::grid=trace`) for both
//! layers. Without it, stderr shows warnings and the log file, written to
//! `<data dir>/logs/timetable.log` and rotated daily, records debug and up.

use crate::storage::project_dirs;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the global subscriber. `console` enables the stderr layer; the TUI
/// turns it off so log lines do not land on the alternate screen.
pub fn init(console: bool) {
    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(env_filter("warn"))
    });

    let file_layer = match logs_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "timetable.log");
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(env_filter("debug")),
            )
        }
        Err(e) => {
            if console {
                eprintln!("Warning: could not initialize file logging: {:#}", e);
            }
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn env_filter(default: &str) -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), default)
}

/// Builds a filter from `directives`, falling back to `default` when they are
/// absent or do not parse.
fn filter_from(directives: Option<&str>, default: &str) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn logs_dir() -> Result<PathBuf> {
    let dir = project_dirs()?.data_dir().join("logs");
    fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    Ok(dir)
}
