//! Intake CLI: turn call transcripts into a business-formation profile.
//!
//! Processes one transcript per call, accumulates what each caller has told
//! us, and prints the personalised script for their next call.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
