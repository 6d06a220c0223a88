//! gh-rdm - Remote Development Manager
//!
//! Forwards clipboard and open-URL operations from an SSH session to the
//! host machine running `gh-rdm server`.

use clap::Parser;
use commands::Commands;
use rdm::{cli, commands, common::logging, daemon, Result};

#[derive(Parser)]
#[command(
    name = "gh-rdm",
    about = "Remote Development Manager - clipboard and open forwarding over SSH"
)]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server => {
            if let Some(path) = logging::init_server() {
                tracing::debug!(log = %path.display(), "Logging to file");
            }
            daemon::start()
        }
        command => {
            logging::init_cli();
            run_client(command)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Run a one-shot client command
fn run_client(command: Commands) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::dispatch(command))
}
