//! Server mode - long-running host agent
//!
//! Runs on the machine that owns the clipboard. Clients on the same machine
//! reach it through the local socket; clients in an SSH session reach it
//! through a RemoteForward of that socket.

mod handler;
mod server;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::common::{config::Config, paths, Result};
use crate::host::{HostService, SystemHost};

pub use handler::handle_request;
pub use server::{Server, ServerState};

/// Entry point for the `server` subcommand
///
/// Builds the runtime itself so that a host program still hanging after the
/// grace period cannot keep the process alive.
pub fn start() -> Result<()> {
    let config = Config::load()?;
    let grace = config.server.shutdown_grace();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    block_on(runtime, grace, run(config))
}

/// Drive `future` to completion, then give the runtime at most `grace` to
/// wind down
///
/// Dropping a runtime waits for every blocking task, however long it takes.
/// A stuck `xclip` or `pbcopy` is abandoned instead.
pub fn block_on<F>(runtime: Runtime, grace: Duration, future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let result = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    result
}

/// Run in server mode
///
/// Binds the well-known socket and returns once a `stop` command or a
/// termination signal has shut the server down.
pub async fn run(config: Config) -> Result<()> {
    let host = SystemHost::new();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        platform = ?host.platform(),
        "Starting gh-rdm server"
    );

    let host: Arc<dyn HostService> = Arc::new(host);
    let server = Server::new(host, paths::socket_path(), config.server);

    let root = CancellationToken::new();
    let signals = tokio::spawn({
        let root = root.clone();
        async move {
            let signal = shutdown_signal().await;
            tracing::info!("Received {}, shutting down gracefully", signal);
            root.cancel();
        }
    });

    let result = server.listen(&root).await;
    signals.abort();
    result
}

/// Wait for SIGINT, SIGTERM or SIGHUP
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sighup) =
        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to register signal handlers, using ctrl-c only");
                ctrl_c_or_pending(tokio::signal::ctrl_c()).await;
                return "SIGINT";
            }
        };

    tokio::select! {
        () = ctrl_c_or_pending(tokio::signal::ctrl_c()) => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    ctrl_c_or_pending(tokio::signal::ctrl_c()).await;
    "ctrl-c"
}

/// Wait for ctrl-c, or forever if its handler could not be installed
async fn ctrl_c_or_pending<F>(ctrl_c: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = ctrl_c.await {
        tracing::error!(error = %e, "ctrl-c signal handler failed");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_failed_ctrl_c_handler_never_fires() {
        let failed = async { Err::<(), _>(io::Error::other("no signal driver")) };
        let waited =
            tokio::time::timeout(Duration::from_millis(50), ctrl_c_or_pending(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_ctrl_c_fires() {
        let fired = async { Ok::<(), io::Error>(()) };
        tokio::time::timeout(Duration::from_millis(50), ctrl_c_or_pending(fired))
            .await
            .unwrap();
    }
}
