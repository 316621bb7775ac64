mod auth;
mod cli;
mod config;
mod dci;
mod error;
mod jobs;
mod output;
mod pagination;
mod quarterly;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting DCILens - DCI Job Insights Tool");
    cli.execute().await?;

    Ok(())
}
