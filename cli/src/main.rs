use std::sync::Arc;

use cli::shell::{self, ParseError, ShellCommand};
use encdev::{DeviceConfig, DeviceHost, IdGen};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DeviceConfig::from_env()?;
    let host = DeviceHost::register(config, Arc::new(IdGen::new()))?;
    let client = host.client();
    let runner = tokio::spawn(host.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match shell::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                println!("error: {e}");
                continue;
            }
        };

        match shell::execute(&client, &command).await {
            Ok(output) => println!("{output}"),
            Err(e) => {
                error!(?command, "command failed: {e}");
                println!("error: {e} (errno {})", e.errno());
            }
        }
    }

    drop(client);
    runner.await?;
    info!("shell finished");
    Ok(())
}
