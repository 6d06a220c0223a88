//! Command handler for processing IPC requests
//!
//! Decodes one request, runs it against the host service and builds the
//! response. Nothing here can take the server down: every failure becomes an
//! error response.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::host::HostService;
use crate::ipc::protocol::{Command, Envelope, Response, STATUS_RUNNING};

/// Handle an encoded IPC request
pub async fn handle_request(
    host: &Arc<dyn HostService>,
    shutdown: &CancellationToken,
    data: &[u8],
) -> Response {
    match handle_request_inner(host, shutdown, data).await {
        Ok(body) => Response::success(body),
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            Response::error(&e)
        }
    }
}

async fn handle_request_inner(
    host: &Arc<dyn HostService>,
    shutdown: &CancellationToken,
    data: &[u8],
) -> Result<Vec<u8>> {
    let command = Command::try_from(Envelope::decode(data)?)?;
    tracing::debug!(command = command.name(), "Received command");

    match command {
        Command::Status => Ok(STATUS_RUNNING.to_vec()),

        Command::Copy(text) => {
            run_blocking(host, "copy", move |host| host.copy(&text)).await?;
            Ok(Vec::new())
        }

        Command::Paste => run_blocking(host, "paste", |host| host.paste()).await,

        Command::Open(target) => {
            run_blocking(host, "open", move |host| host.open(&target)).await?;
            Ok(Vec::new())
        }

        Command::Stop => {
            if shutdown.is_cancelled() {
                tracing::debug!("Stop received while already shutting down");
            } else {
                tracing::info!("Stop requested by client");
            }
            shutdown.cancel();
            Ok(Vec::new())
        }
    }
}

/// Run a host operation on the blocking pool
///
/// Errors that do not already name their operation are wrapped with `op`.
async fn run_blocking<T, F>(host: &Arc<dyn HostService>, op: &'static str, f: F) -> Result<T>
where
    F: FnOnce(&dyn HostService) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let host = Arc::clone(host);
    let result = tokio::task::spawn_blocking(move || f(host.as_ref()))
        .await
        .map_err(|e| Error::capability(op, e.to_string()))?;

    result.map_err(|e| match e {
        Error::Capability { .. } => e,
        other => Error::capability(op, other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::Status;
    use std::sync::Mutex;

    /// Records calls and returns configured values
    #[derive(Default)]
    struct MockHost {
        copied: Mutex<Vec<String>>,
        opened: Mutex<Vec<String>>,
        pastes: Mutex<usize>,
        paste_data: Vec<u8>,
        fail: bool,
    }

    impl HostService for MockHost {
        fn copy(&self, text: &str) -> Result<()> {
            self.copied.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(Error::capability("copy", "copy broke"));
            }
            Ok(())
        }

        fn paste(&self) -> Result<Vec<u8>> {
            *self.pastes.lock().unwrap() += 1;
            if self.fail {
                return Err(Error::UnsupportedPlatform("plan9".to_string()));
            }
            Ok(self.paste_data.clone())
        }

        fn open(&self, target: &str) -> Result<()> {
            self.opened.lock().unwrap().push(target.to_string());
            Ok(())
        }
    }

    impl MockHost {
        fn calls(&self) -> usize {
            self.copied.lock().unwrap().len()
                + self.opened.lock().unwrap().len()
                + *self.pastes.lock().unwrap()
        }
    }

    async fn send(host: &Arc<MockHost>, envelope: Envelope) -> Response {
        let host: Arc<dyn HostService> = host.clone();
        let data = envelope.encode().unwrap();
        handle_request(&host, &CancellationToken::new(), &data).await
    }

    #[tokio::test]
    async fn test_copy_command() {
        let mock = Arc::new(MockHost::default());
        let response = send(&mock, Envelope::new("copy", ["hello world"])).await;

        assert_eq!(response, Response::ok());
        assert_eq!(*mock.copied.lock().unwrap(), ["hello world"]);
    }

    #[tokio::test]
    async fn test_paste_command() {
        let mock = Arc::new(MockHost {
            paste_data: b"clipboard content".to_vec(),
            ..Default::default()
        });
        let response = send(&mock, Envelope::new("paste", Vec::<String>::new())).await;

        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.body, b"clipboard content");
    }

    #[tokio::test]
    async fn test_paste_empty_clipboard() {
        let mock = Arc::new(MockHost::default());
        let response = send(&mock, Envelope::new("paste", Vec::<String>::new())).await;
        assert_eq!(response, Response::ok());
    }

    #[tokio::test]
    async fn test_open_command() {
        let mock = Arc::new(MockHost::default());
        let response = send(&mock, Envelope::new("open", ["https://example.com"])).await;

        assert_eq!(response.status, Status::Ok);
        assert_eq!(*mock.opened.lock().unwrap(), ["https://example.com"]);
    }

    #[tokio::test]
    async fn test_status_command() {
        let mock = Arc::new(MockHost::default());
        let response = send(&mock, Envelope::new("status", ["extra"])).await;

        assert_eq!(response.status, Status::Ok);
        let status: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(status["status"], "running");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_copy_command_error() {
        let mock = Arc::new(MockHost {
            fail: true,
            ..Default::default()
        });
        let response = send(&mock, Envelope::new("copy", ["hello"])).await;

        assert_eq!(response.status, Status::Internal);
        assert_eq!(response.body, b"copy failed: copy broke");
    }

    #[tokio::test]
    async fn test_uncategorized_provider_error_gets_operation_name() {
        let mock = Arc::new(MockHost {
            fail: true,
            ..Default::default()
        });
        let response = send(&mock, Envelope::new("paste", Vec::<String>::new())).await;

        assert_eq!(response.status, Status::Internal);
        assert_eq!(response.body, b"paste failed: unsupported platform: plan9");
    }

    #[tokio::test]
    async fn test_missing_argument_skips_provider() {
        let mock = Arc::new(MockHost::default());
        for name in ["copy", "open"] {
            let response = send(&mock, Envelope::new(name, Vec::<String>::new())).await;
            assert_eq!(response.status, Status::BadRequest);
            assert_eq!(
                String::from_utf8(response.body).unwrap(),
                format!("{} requires an argument", name)
            );
        }
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mock = Arc::new(MockHost::default());
        let response = send(&mock, Envelope::new("paint", ["red"])).await;

        assert_eq!(response.status, Status::BadRequest);
        assert_eq!(response.body, b"unknown command: paint");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let host: Arc<dyn HostService> = Arc::new(MockHost::default());
        let response = handle_request(&host, &CancellationToken::new(), b"{oops").await;

        assert_eq!(response.status, Status::BadRequest);
        assert!(response.body.starts_with(b"parse command: "));
    }

    #[tokio::test]
    async fn test_stop_cancels_and_is_idempotent() {
        let host: Arc<dyn HostService> = Arc::new(MockHost::default());
        let token = CancellationToken::new();
        let data = Envelope::new("stop", Vec::<String>::new()).encode().unwrap();

        assert_eq!(handle_request(&host, &token, &data).await, Response::ok());
        assert!(token.is_cancelled());
        assert_eq!(handle_request(&host, &token, &data).await, Response::ok());
    }
}
