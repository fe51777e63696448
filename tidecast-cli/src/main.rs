//! Tidecast CLI - torrent streaming server
//!
//! Starts the HTTP API over the simulated engine, or inspects a content library.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "tidecast")]
#[command(about = "Stream torrent content over HTTP while it downloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await
}
