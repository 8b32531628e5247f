//! File-backed tracing setup. The terminal belongs to the TUI, so log lines
//! go to a JSON lines file instead of stderr.

use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use crate::app_dirs::AppDirs;

static TRACING_INIT: OnceLock<Option<PathBuf>> = OnceLock::new();

pub fn log_path() -> PathBuf {
    env::var("HALFTYPE_LOG")
        .map(PathBuf::from)
        .ok()
        .or_else(AppDirs::log_path)
        .unwrap_or_else(|| env::temp_dir().join("halftype.log"))
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing_once(level: &str, once: &OnceLock<Option<PathBuf>>) -> Option<PathBuf> {
    once.get_or_init(|| {
        let path = log_path();
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_env_filter(filter(level))
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok()?;
        Some(path)
    })
    .clone()
}

/// Install the global subscriber. Returns the log file in use, or `None` if
/// logging could not be set up.
pub fn init_tracing(level: &str) -> Option<PathBuf> {
    init_tracing_once(level, &TRACING_INIT)
}
