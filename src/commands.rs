//! CLI command definitions
//!
//! Defines the clap commands for gh-rdm.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gh-rdm server on the host machine
    Server,

    /// Stop the running server
    Stop,

    /// Check whether the server is reachable
    Status,

    /// Copy stdin content to the host clipboard
    Copy,

    /// Paste host clipboard content to stdout
    Paste,

    /// Open a URL or file on the host machine
    Open {
        /// URL or path to open
        target: String,
    },

    /// Print the local socket path (for SSH RemoteForward)
    Socket,
}
