//! IPC transport layer
//!
//! The server only ever binds the local channel (a Unix domain socket via the
//! interprocess crate). Clients inside an SSH session cannot see that socket
//! and instead dial a loopback TCP port that `ssh -R` forwards back to it, so
//! both transports carry the same length-prefixed frames.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::common::paths;

/// Maximum message size (10 MB)
const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

/// Loopback port the SSH RemoteForward listens on
pub const FORWARD_PORT: u16 = 7391;

/// Environment variables whose presence means we are inside an SSH session
const SSH_ENV_VARS: [&str; 3] = ["SSH_TTY", "SSH_CLIENT", "SSH_CONNECTION"];

pub mod platform {
    pub use interprocess::local_socket::tokio::{prelude::*, Listener, Stream};
    pub use interprocess::local_socket::{GenericFilePath, ListenerOptions};
}

use platform::*;

/// Where a client sends its command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Local channel, used when running directly on the host
    Local(PathBuf),
    /// Forwarded loopback port, used from a remote session
    Forwarded(SocketAddr),
}

impl Target {
    /// Resolve the target from the process environment
    pub fn resolve(socket_override: Option<&Path>, forward_port: u16) -> Self {
        Self::resolve_with(
            |key| std::env::var(key).ok(),
            socket_override,
            forward_port,
        )
    }

    /// Resolve the target using `lookup` in place of the environment
    ///
    /// Any non-empty SSH indicator selects the forwarded endpoint, even when
    /// an override path is given.
    pub fn resolve_with<F>(lookup: F, socket_override: Option<&Path>, forward_port: u16) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let remote = SSH_ENV_VARS
            .iter()
            .any(|key| lookup(key).is_some_and(|value| !value.is_empty()));

        if remote {
            Target::Forwarded(SocketAddr::from((Ipv4Addr::LOCALHOST, forward_port)))
        } else {
            Target::Local(
                socket_override
                    .map(Path::to_path_buf)
                    .unwrap_or_else(paths::socket_path),
            )
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local(path) => write!(f, "{}", path.display()),
            Target::Forwarded(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// A bidirectional byte stream over either transport
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Connection for T {}

/// Create a listener on the local channel at `path`
///
/// Fails with [`io::ErrorKind::AddrInUse`] if the socket file already exists;
/// deciding whether it is stale is up to the caller.
pub fn bind(path: &Path) -> io::Result<Listener> {
    let name = path.to_fs_name::<GenericFilePath>()?;
    let listener = ListenerOptions::new().name(name).create_tokio()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(listener)
}

/// Connect to `target`
pub async fn connect(target: &Target) -> io::Result<Box<dyn Connection>> {
    match target {
        Target::Local(path) => {
            let name = path.as_path().to_fs_name::<GenericFilePath>()?;
            let stream = Stream::connect(name).await?;
            Ok(Box::new(stream))
        }
        Target::Forwarded(addr) => {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
    }
}

/// Send a length-prefixed message
pub async fn send_message<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    data: &[u8],
) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Message too large: {} bytes", data.len()),
        ));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive a length-prefixed message
pub async fn recv_message<R: AsyncRead + Unpin + ?Sized>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data).await?;
    Ok(data)
}
