use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RFOCUS_LOG";
pub const LOG_FILE: &str = "rfocus.log";

/// Installs the global subscriber, writing to `<dir>/rfocus.log`.
///
/// The terminal belongs to the UI, so nothing is written to stdout. Returns
/// an error string when the file cannot be opened or a subscriber is already
/// installed; the caller keeps running without logs.
pub fn init_logging(level: &str, dir: &Path) -> Result<(), String> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let file = open_log_file(dir)?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| format!("logging already initialized: {err}"))
}

fn open_log_file(dir: &Path) -> Result<File, String> {
    std::fs::create_dir_all(dir)
        .map_err(|err| format!("failed to create log directory `{}`: {err}", dir.display()))?;
    let path = dir.join(LOG_FILE);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed to open `{}`: {err}", path.display()))
}
