use clap::{Parser, Subcommand};

mod file;
mod stream;
mod utils;

pub use utils::*;

#[derive(Parser, Debug)]
#[command(name = "vandal", author = "joshbarbee", version = "0.1.0")]
#[command(about = "Vulnerability analysis over Vandal execution traces", long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Stream new blocks from the node and analyze every transaction
    #[command(name = "cli")]
    Cli(stream::StreamArgs),
    /// Analyze a single transaction by hash
    #[command(name = "file")]
    File(file::FileArgs),
}

impl Commands {
    pub async fn execute(self) -> eyre::Result<()> {
        match self {
            Commands::Cli(args) => args.execute().await,
            Commands::File(args) => args.execute().await,
        }
    }
}
