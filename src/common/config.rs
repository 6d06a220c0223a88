//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// How long in-flight requests may run after shutdown begins
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Upper bound on reading a request and writing its response
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: default_shutdown_grace(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_shutdown_grace() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    10
}

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Overall timeout for one round trip
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,

    /// Loopback port the SSH RemoteForward listens on
    #[serde(default = "default_forward_port")]
    pub forward_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_client_timeout(),
            forward_port: default_forward_port(),
        }
    }
}

fn default_client_timeout() -> u64 {
    10
}
fn default_forward_port() -> u16 {
    crate::ipc::transport::FORWARD_PORT
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.client.timeout_secs, 10);
        assert_eq!(config.client.forward_port, 7391);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nshutdown_grace_secs = 1\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.shutdown_grace_secs, 1);
        assert_eq!(config.server.request_timeout_secs, 10);
        assert_eq!(config.client.forward_port, 7391);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
