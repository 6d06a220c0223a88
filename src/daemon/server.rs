//! Server - IPC listener, lifecycle and shutdown

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use interprocess::local_socket::traits::tokio::Listener as ListenerTrait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::common::{config::ServerConfig, paths, Error, Result};
use crate::host::HostService;
use crate::ipc::transport::{self, platform::Listener, platform::Stream};
use crate::ipc::Client;

use super::handler;

/// How long the bind probe waits for an existing server to answer
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Consecutive accept failures tolerated before the listener is given up
const MAX_ACCEPT_ERRORS: u32 = 8;

/// Lifecycle of a [`Server`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Unbound,
    Serving,
    ShuttingDown,
    Terminated,
}

/// gh-rdm command server
pub struct Server {
    /// Host clipboard/open implementation
    host: Arc<dyn HostService>,
    /// Local channel path
    path: PathBuf,
    /// Timeouts
    config: ServerConfig,
    /// Current lifecycle state
    state: watch::Sender<ServerState>,
}

impl Server {
    pub fn new(host: Arc<dyn HostService>, path: impl Into<PathBuf>, config: ServerConfig) -> Self {
        let (state, _) = watch::channel(ServerState::Unbound);
        Self {
            host,
            path: path.into(),
            config,
            state,
        }
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Bind the local channel and serve until `parent` or a `stop` command
    /// cancels the server
    pub async fn listen(&self, parent: &CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        let shutdown = parent.child_token();
        self.serve(listener, shutdown).await
    }

    /// Create the listener, reclaiming a stale socket left by a dead server
    ///
    /// The probe and the removal are not atomic: two servers starting at the
    /// same moment can both judge the socket stale, and the loser of the
    /// second bind reports `BindFailed`.
    async fn bind(&self) -> Result<Listener> {
        match transport::bind(&self.path) {
            Ok(listener) => Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                let probe = Client::local(&self.path, PROBE_TIMEOUT);
                if probe.send("status", Vec::<String>::new()).await.is_ok() {
                    return Err(Error::AlreadyRunning(self.path.clone()));
                }

                tracing::info!(path = %self.path.display(), "Removing stale socket");
                paths::remove_socket(&self.path)
                    .map_err(|e| Error::bind_failed(&self.path, e))?;

                transport::bind(&self.path).map_err(|e| Error::bind_failed(&self.path, e))
            }
            Err(e) => Err(Error::bind_failed(&self.path, e)),
        }
    }

    async fn serve(&self, listener: Listener, shutdown: CancellationToken) -> Result<()> {
        self.state.send_replace(ServerState::Serving);
        tracing::info!(path = %self.path.display(), "Server listening");

        let tracker = TaskTracker::new();
        let mut accept_errors = 0u32;

        let result = loop {
            tokio::select! {
                () = shutdown.cancelled() => break Ok(()),
                accept_result = listener.accept() => match accept_result {
                    Ok(stream) => {
                        accept_errors = 0;
                        tracker.spawn(handle_connection(
                            stream,
                            Arc::clone(&self.host),
                            shutdown.clone(),
                            self.config.request_timeout(),
                        ));
                    }
                    Err(e) => {
                        accept_errors += 1;
                        tracing::error!(error = %e, attempt = accept_errors, "Accept error");
                        if accept_errors >= MAX_ACCEPT_ERRORS {
                            break Err(Error::Io(e));
                        }
                        if backoff(&shutdown, accept_errors).await {
                            break Ok(());
                        }
                    }
                }
            }
        };

        self.shutdown(listener, tracker).await;
        result
    }

    /// Stop accepting, release the socket, then give in-flight requests the
    /// grace period to finish
    async fn shutdown(&self, listener: Listener, tracker: TaskTracker) {
        self.state.send_replace(ServerState::ShuttingDown);
        tracing::info!("Shutting down server");

        drop(listener);
        if let Err(e) = paths::remove_socket(&self.path) {
            tracing::warn!(error = %e, "Failed to remove socket");
        }

        tracker.close();
        let grace = self.config.shutdown_grace();
        if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
            tracing::warn!(
                in_flight = tracker.len(),
                grace_secs = grace.as_secs(),
                "Grace period elapsed with requests still in flight"
            );
        }

        self.state.send_replace(ServerState::Terminated);
        tracing::info!("Server shutdown complete");
    }
}

/// Sleep after the `attempt`th consecutive accept failure
///
/// Returns true if `shutdown` fired during the wait.
async fn backoff(shutdown: &CancellationToken, attempt: u32) -> bool {
    let delay = Duration::from_millis(10 << attempt);
    tokio::select! {
        () = shutdown.cancelled() => true,
        () = tokio::time::sleep(delay) => false,
    }
}

/// Handle a single client connection: one request, one response
async fn handle_connection(
    mut stream: Stream,
    host: Arc<dyn HostService>,
    shutdown: CancellationToken,
    timeout: Duration,
) {
    let exchange = async {
        let request = transport::recv_message(&mut stream).await?;
        let response = handler::handle_request(&host, &shutdown, &request).await;
        transport::send_message(&mut stream, &response.encode()).await
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            tracing::debug!("Client disconnected");
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "Error handling client"),
        Err(_) => tracing::warn!("Client timed out"),
    }
}
