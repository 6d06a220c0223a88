//! Socket, configuration and log paths
//!
//! The local channel lives at `<tmp>/gh-rdm.sock` so that an SSH
//! `RemoteForward 127.0.0.1:7391 <socket>` line can point at a stable path.

use std::io;
use std::path::{Path, PathBuf};

/// Project name used for config and data directories
const PROJECT_NAME: &str = "gh-rdm";

/// File name of the local channel inside the temp directory
const SOCKET_FILE: &str = "gh-rdm.sock";

/// Get the well-known path of the local channel
pub fn socket_path() -> PathBuf {
    std::env::temp_dir().join(SOCKET_FILE)
}

/// Remove a socket file, treating an already-missing file as success
pub fn remove_socket(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/gh-rdm/`
/// - macOS: `~/Library/Application Support/gh-rdm/`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
}
