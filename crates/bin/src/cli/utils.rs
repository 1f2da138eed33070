use std::{path::Path, str::FromStr};

use tracing::warn;
use vandal_core::BlockSpec;
use vandal_inspect::{Heuristic, Heuristics};

/// clap value parser for the `--heuristics` selector.
pub fn parse_heuristic(name: &str) -> Result<Heuristics, String> {
    Heuristics::from_str(name.trim()).map_err(|_| {
        let known: Vec<String> = Heuristics::all().iter().map(|h| h.to_string()).collect();
        format!("unknown heuristic `{name}` (known: {})", known.join(", "))
    })
}

/// clap value parser for `--block`.
pub fn parse_block_spec(spec: &str) -> Result<BlockSpec, String> {
    BlockSpec::from_str(spec)
}

/// Instantiate the selected heuristics, defaulting to the full registry.
/// Dynamic discovery is compiled in statically; a `--heuristic-dir` is
/// acknowledged and ignored.
pub fn init_heuristics(
    selected: Option<Vec<Heuristics>>,
    heuristic_dir: Option<&Path>,
) -> Vec<Box<dyn Heuristic>> {
    if let Some(dir) = heuristic_dir {
        warn!(
            target: "vandal::cli",
            dir = %dir.display(),
            "heuristics are registered at compile time; ignoring --heuristic-dir"
        );
    }
    selected
        .unwrap_or_else(Heuristics::all)
        .into_iter()
        .map(Heuristics::init)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_parser_accepts_registry_names() {
        assert_eq!(parse_heuristic("reentrancy").unwrap(), Heuristics::Reentrancy);
        assert_eq!(parse_heuristic(" failed_send ").unwrap(), Heuristics::FailedSend);
        assert!(parse_heuristic("cex_dex").is_err());
    }

    #[test]
    fn defaults_to_every_heuristic() {
        let set = init_heuristics(None, None);
        assert_eq!(set.len(), Heuristics::all().len());
    }

    #[test]
    fn selection_is_respected() {
        let set = init_heuristics(Some(vec![Heuristics::Timestamp]), None);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].name(), "timestamp");
    }
}
