// Tracing setup: an opt-in stderr layer driven by RUST_LOG, plus an optional timestamped log file.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `log-YYYYMMDD-HHMMSS.txt` for the given instant
pub fn log_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("log-{}.txt", now.format("%Y%m%d-%H%M%S"))
}

/// Install the global subscriber.
///
/// Stderr only receives events when `RUST_LOG` asks for them. With `log_dir`,
/// INFO and above also go to a new file in that directory, whose path is returned.
pub fn init_logging(log_dir: Option<&Path>) -> io::Result<Option<PathBuf>> {
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            let path = dir.join(log_file_name(&Local::now()));
            let file = File::create(&path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests drive the pipeline repeatedly)
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(log_path)
}
