//! CLI command handling
//!
//! Each subcommand is a single round trip to the server.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::commands::Commands;
use crate::common::{config::Config, paths, Error, Result};
use crate::ipc::Client;

/// Dispatch a client-side CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    let config = Config::load()?;
    let client = Client::new(&config.client);
    tracing::debug!(target = %client.target(), "Resolved server endpoint");

    match command {
        Commands::Server => {
            // Should never happen - server mode is handled in main
            unreachable!("Server command should be handled in main")
        }

        Commands::Stop => {
            client.send("stop", Vec::<String>::new()).await?.into_body()?;
            println!("Server stopped");
            Ok(())
        }

        Commands::Status => {
            if client.ping().await? {
                println!("Server is running ({})", client.target());
                Ok(())
            } else {
                Err(Error::ServerNotRunning)
            }
        }

        Commands::Copy => {
            let mut data = Vec::new();
            tokio::io::stdin().read_to_end(&mut data).await?;
            let text = String::from_utf8_lossy(&data);

            client.send("copy", [text]).await?.into_body()?;
            Ok(())
        }

        Commands::Paste => {
            let body = client
                .send("paste", Vec::<String>::new())
                .await?
                .into_body()?;

            let mut stdout = tokio::io::stdout();
            stdout.write_all(&body).await?;
            stdout.flush().await?;
            Ok(())
        }

        Commands::Open { target } => {
            client.send("open", [target]).await?.into_body()?;
            Ok(())
        }

        Commands::Socket => {
            println!("{}", paths::socket_path().display());
            Ok(())
        }
    }
}
