//! CLI-side IPC client for communicating with the server

use std::io;
use std::path::Path;
use std::time::Duration;

use crate::common::config::ClientConfig;
use crate::common::{Error, Result};

use super::protocol::{Envelope, Response};
use super::transport::{self, Target};

/// Client for one round trip to the gh-rdm server
#[derive(Debug, Clone)]
pub struct Client {
    target: Target,
    timeout: Duration,
}

impl Client {
    /// Resolve the transport from the environment
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_target(
            Target::resolve(None, config.forward_port),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Talk to the local channel at `path`, ignoring any SSH session
    pub fn local(path: &Path, timeout: Duration) -> Self {
        Self::with_target(Target::Local(path.to_path_buf()), timeout)
    }

    pub fn with_target(target: Target, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Send a command and wait for the response
    ///
    /// Only transport failures are errors here; a command the server rejected
    /// comes back as a non-success [`Response`].
    pub async fn send<I, S>(&self, name: &str, arguments: I) -> Result<Response>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = Envelope::new(name, arguments).encode()?;

        tokio::time::timeout(self.timeout, self.round_trip(&request))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }

    async fn round_trip(&self, request: &[u8]) -> Result<Response> {
        let mut stream = transport::connect(&self.target).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound || e.kind() == io::ErrorKind::ConnectionRefused
            {
                Error::ServerNotRunning
            } else {
                Error::ConnectionFailed(e)
            }
        })?;

        transport::send_message(&mut stream, request)
            .await
            .map_err(|e| Error::ServerCommunication(e.to_string()))?;

        let response_data = transport::recv_message(&mut stream)
            .await
            .map_err(|e| Error::ServerCommunication(e.to_string()))?;

        Response::decode(&response_data)
    }

    /// Check if the server is responding
    pub async fn ping(&self) -> Result<bool> {
        match self.send("status", Vec::<String>::new()).await {
            Ok(response) => Ok(response.is_success()),
            Err(e) if e.is_transport() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
