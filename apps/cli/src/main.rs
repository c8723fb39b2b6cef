//! Briefwire CLI: defense-news ingestion and knowledge extraction.
//!
//! Pulls the source catalog's feeds into a local libSQL database, extracts
//! article text, and tags each article with canonical topics.

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
