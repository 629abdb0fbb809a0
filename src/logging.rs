//! Tracing setup. The terminal belongs to the UI, so events go to a file.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "STICKIES_LOG";

/// Filter used when `STICKIES_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "stickies=debug,info"
    } else {
        "stickies=info,warn"
    }
}

/// Installs a file-backed subscriber. Logging is best effort: if the file
/// cannot be opened the application runs without it.
pub fn init(log_path: &Path, verbose: bool) {
    if let Some(parent) = log_path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();

    tracing::info!(path = %log_path.display(), version = env!("CARGO_PKG_VERSION"), "stickies starting");
}
