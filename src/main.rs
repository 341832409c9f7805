//! lakehouse-bench - SQL engine benchmarking over lakehouse tables

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.run().await
}
