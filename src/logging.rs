use crate::errors::StartupError;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub const LOG_FILE: &str = "agent.log";
pub const ERROR_LOG_FILE: &str = "agent.error.log";

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Append handles for the level-split log files.
pub struct LogFiles {
    pub main: File,
    pub error: File,
}

impl LogFiles {
    /// Open (append, create) both files in an existing directory.
    pub fn open(dir: &Path) -> Result<Self, StartupError> {
        Ok(Self {
            main: open_append(&dir.join(LOG_FILE))?,
            error: open_append(&dir.join(ERROR_LOG_FILE))?,
        })
    }
}

fn open_append(path: &Path) -> Result<File, StartupError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StartupError::LogDestination {
            path: path.display().to_string(),
            source,
        })
}

/// Console output, plain or one JSON object per line. Both use the local-time stamp.
fn console_layer<S, W>(json: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_timer(LocalTimer).with_writer(writer);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Install the global subscriber: console on stderr, plus `agent.log` (everything
/// below ERROR) and `agent.error.log` (ERROR only) when a log directory is given.
pub fn init(log_dir: Option<&Path>, json: bool) -> Result<(), StartupError> {
    let files = log_dir.map(LogFiles::open).transpose()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = console_layer(json, std::io::stderr);

    let (main_layer, error_layer) = match files {
        Some(LogFiles { main, error }) => (
            Some(
                fmt::layer()
                    .with_timer(LocalTimer)
                    .with_ansi(false)
                    .with_writer(Mutex::new(main))
                    .with_filter(filter_fn(|meta| *meta.level() != Level::ERROR)),
            ),
            Some(
                fmt::layer()
                    .with_timer(LocalTimer)
                    .with_ansi(false)
                    .with_writer(Mutex::new(error))
                    .with_filter(LevelFilter::ERROR),
            ),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(main_layer)
        .with(error_layer)
        .try_init()
        .map_err(|e| StartupError::Subscriber(e.to_string()))
}
