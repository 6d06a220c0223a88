//! IPC communication between client invocations and the server
//!
//! Uses a Unix domain socket on the host via the interprocess crate, or a
//! forwarded loopback TCP port from inside an SSH session.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::Client;
