use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing::{info, warn};
use vandal_core::{BlockSpec, GethIpcProvider, TraceFeed};
use vandal_inspect::Heuristics;

use super::{init_heuristics, parse_block_spec, parse_heuristic};
use crate::analyzer::Analyzer;

#[derive(Debug, Parser)]
pub struct StreamArgs {
    /// Path to the node's IPC socket
    #[arg(long, default_value = "/tmp/geth.ipc")]
    pub ipc: PathBuf,
    /// Block to start streaming from
    #[arg(long, default_value = "latest", value_parser = parse_block_spec)]
    pub block: BlockSpec,
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

impl StreamArgs {
    pub async fn execute(self) -> eyre::Result<()> {
        info!(target: "vandal::cli", block = %self.block, "starting streaming analysis");

        let heuristics = init_heuristics(self.heuristics, self.heuristic_dir.as_deref());
        let analyzer = Analyzer::new(heuristics, self.output);

        let provider = Arc::new(GethIpcProvider::connect(&self.ipc).await?);
        let mut traces = TraceFeed::new(provider, self.block).spawn();

        // per-transaction failures are logged and skipped; the loop only
        // ends when the feed closes (exhausted backoff or shutdown)
        while let Some(trace) = traces.recv().await {
            let tx_hash = trace.tx_hash;
            match analyzer.analyze_trace(&trace) {
                Ok(reports) => analyzer.emit(&reports)?,
                Err(err) => {
                    warn!(target: "vandal::cli", %tx_hash, %err, "skipping transaction")
                }
            }
        }

        info!(target: "vandal::cli", "trace feed closed, exiting");
        Ok(())
    }
}
