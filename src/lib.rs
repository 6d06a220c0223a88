//! gh-rdm - clipboard and open forwarding for remote shells
//!
//! A long-running server on the host exposes copy/paste/open over a local
//! socket; short-lived clients send it one command each.

pub mod cli;
pub mod commands;
pub mod common;
pub mod daemon;
pub mod host;
pub mod ipc;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use host::HostService;
pub use ipc::protocol::{Command, Envelope, Response, Status};
