//! Logging and tracing configuration
//!
//! Client invocations log compactly to stderr. The server runs for a long time
//! in the background, so it also appends to a log file.

use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Initialize tracing for one-shot client commands (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Clipboard output goes to stdout, so only warnings are shown by default.
pub fn init_cli() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rdm=warn,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for the server (file + stderr logging)
///
/// The server logs to both:
/// 1. A log file at `<data-dir>/gh-rdm/logs/server.log`
/// 2. stderr
///
/// Returns the log file path when file logging could be set up.
pub fn init_server() -> Option<PathBuf> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rdm=debug,info"));

    if let Some(log_file) = server_log_path() {
        let opened = log_file
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| {
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_file)
            });

        match opened {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true);

                let stderr_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact();

                tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .with(stderr_layer)
                    .init();

                return Some(log_file);
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file: {}", e);
            }
        }
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    None
}

/// Get the path to the server log file
pub fn server_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("server.log"))
}
