use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::{filter::EnvFilter, prelude::*, Layer, Registry};

mod analyzer;
mod cli;
mod runner;

fn main() {
    // clap exits 2 on its own for usage errors
    let args = cli::Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let subscriber = Registry::default().with(tracing_subscriber::fmt::layer().with_filter(filter));
    tracing::subscriber::set_global_default(subscriber)
        .expect("could not set global default subscriber");

    if let Err(err) = runner::run_command_until_exit(|| args.command.execute()) {
        for (depth, cause) in err.chain().enumerate() {
            if depth == 0 {
                error!(target: "vandal::cli", "{cause}");
            } else {
                error!(target: "vandal::cli", "caused by: {cause}");
            }
        }
        std::process::exit(1);
    }
}
