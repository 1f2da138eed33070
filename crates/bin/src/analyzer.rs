//! Per-trace pipeline orchestration and result emission.

use std::path::PathBuf;

use alloy_primitives::B256;
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};
use vandal_core::{decode_trace, lift_trace, partition_blocks, VandalTrace};
use vandal_inspect::{required_op_union, Heuristic, OpLoader, Results};
use vandal_types::FastHashSet;

/// One heuristic's findings for one transaction; serializes to the
/// persisted output document.
#[derive(Debug, Serialize)]
pub struct HeuristicReport {
    pub heuristic: &'static str,
    pub tx_hash: B256,
    #[serde(flatten)]
    pub results: Results,
}

/// Owns the registered heuristics and runs the full pipeline over traces:
/// decode → partition → lift → load views → analyze.
pub struct Analyzer {
    heuristics: Vec<Box<dyn Heuristic>>,
    requested: FastHashSet<&'static str>,
    output: Option<PathBuf>,
}

impl Analyzer {
    pub fn new(heuristics: Vec<Box<dyn Heuristic>>, output: Option<PathBuf>) -> Self {
        for heuristic in &heuristics {
            info!(target: "vandal::analyzer", name = heuristic.name(), "registered heuristic");
        }
        let requested = required_op_union(&heuristics);
        Self { heuristics, requested, output }
    }

    pub fn analyze_trace(&self, trace: &VandalTrace) -> eyre::Result<Vec<HeuristicReport>> {
        let raw = decode_trace(trace)?;
        let program = lift_trace(partition_blocks(raw), trace.to)?;
        let loader = OpLoader::new(&program, &self.requested);

        let mut reports = Vec::with_capacity(self.heuristics.len());
        for heuristic in &self.heuristics {
            // every heuristic starts from fresh views over the shared load
            let results = heuristic.analyze(&loader)?;
            reports.push(HeuristicReport {
                heuristic: heuristic.name(),
                tx_hash: trace.tx_hash,
                results,
            });
        }
        Ok(reports)
    }

    /// Write (or print) every report that found something.
    pub fn emit(&self, reports: &[HeuristicReport]) -> eyre::Result<()> {
        let flagged: Vec<_> = reports.iter().filter(|r| r.results.is_vulnerable()).collect();
        if flagged.is_empty() {
            if let Some(report) = reports.first() {
                debug!(target: "vandal::analyzer", tx_hash = %report.tx_hash, "no findings");
            }
            return Ok(())
        }

        match &self.output {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                for report in flagged {
                    let path = dir.join(format!("{}-{}.json", report.heuristic, report.tx_hash));
                    let file = std::fs::File::create(&path)?;
                    serde_json::to_writer_pretty(file, report)?;
                    info!(target: "vandal::analyzer", path = %path.display(), "wrote report");
                }
            }
            None => {
                for report in flagged {
                    println!(
                        "{} {} flagged by {}",
                        "found vulnerable:".red().bold(),
                        report.tx_hash,
                        report.heuristic.yellow(),
                    );
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&report.results.keyed_rows())?
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use vandal_inspect::Heuristics;

    use super::*;

    fn trace(optrace: &str) -> VandalTrace {
        VandalTrace {
            to: Address::ZERO,
            optrace: Some(optrace.to_string()),
            ops: Some(1),
            tx_hash: B256::repeat_byte(0x42),
        }
    }

    fn analyzer(output: Option<PathBuf>) -> Analyzer {
        Analyzer::new(Heuristics::all().into_iter().map(Heuristics::init).collect(), output)
    }

    #[test]
    fn clean_trace_produces_empty_reports() {
        let analyzer = analyzer(None);
        let reports = analyzer
            .analyze_trace(&trace("0,0,1,PUSH1,_,_,0x1\n2,0,1,POP,_,_,0x\n3,0,1,STOP,_,_,0x"))
            .unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| !r.results.is_vulnerable()));
    }

    #[test]
    fn bad_trace_is_an_error() {
        let analyzer = analyzer(None);
        assert!(analyzer.analyze_trace(&trace("0,0,1,BOGUS,_,_,0x")).is_err());
    }

    #[test]
    fn reports_land_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer(Some(dir.path().to_path_buf()));

        // a timestamp-dependent branch at depth 1
        let reports = analyzer
            .analyze_trace(&trace(
                "0,0,1,TIMESTAMP,_,_,0x64\n\
                 1,0,1,PUSH1,_,_,0x9\n\
                 3,0,1,JUMPI,_,_,0x\n\
                 4,0,1,STOP,_,_,0x",
            ))
            .unwrap();
        analyzer.emit(&reports).unwrap();

        let expected = dir.path().join(format!("timestamp-{}.json", B256::repeat_byte(0x42)));
        assert!(expected.exists());
        let body: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(expected).unwrap()).unwrap();
        assert_eq!(body["heuristic"], "timestamp");
        assert!(!body["rows"].as_array().unwrap().is_empty());
    }
}
