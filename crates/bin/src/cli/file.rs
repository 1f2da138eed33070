use std::path::PathBuf;

use alloy_primitives::B256;
use clap::Parser;
use tracing::info;
use vandal_core::{GethIpcProvider, TraceProvider};
use vandal_inspect::Heuristics;

use super::{init_heuristics, parse_heuristic};
use crate::analyzer::Analyzer;

#[derive(Debug, Parser)]
pub struct FileArgs {
    /// Path to the node's IPC socket
    #[arg(long, default_value = "/tmp/geth.ipc")]
    pub ipc: PathBuf,
    /// Transaction hash to analyze
    #[arg(long)]
    pub tx: B256,
    /// Heuristics to run, comma separated; defaults to all
    #[arg(long, value_delimiter = ',', value_parser = parse_heuristic)]
    pub heuristics: Option<Vec<Heuristics>>,
    /// Root to discover extra heuristics under (the registry is compiled
    /// in; accepted for compatibility)
    #[arg(long = "heuristic-dir")]
    pub heuristic_dir: Option<PathBuf>,
    /// Output directory; results print to stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl FileArgs {
    pub async fn execute(self) -> eyre::Result<()> {
        info!(target: "vandal::cli", tx = %self.tx, "analyzing transaction");

        let heuristics = init_heuristics(self.heuristics, self.heuristic_dir.as_deref());
        let analyzer = Analyzer::new(heuristics, self.output);

        let provider = GethIpcProvider::connect(&self.ipc).await?;
        let trace = provider.vandal_trace(self.tx).await?;

        let reports = analyzer.analyze_trace(&trace)?;
        analyzer.emit(&reports)?;

        info!(target: "vandal::cli", "analysis complete");
        Ok(())
    }
}
