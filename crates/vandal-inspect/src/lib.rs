//! # Vandal Inspect Crate
//!
//! Detection of smart-contract vulnerability patterns over lifted execution
//! traces. The crate provides:
//!
//! - the [`MetaOp`](meta_op::MetaOp) model: typed per-opcode projections
//!   with named operand/result slots;
//! - the [`OpLoader`](loader::OpLoader): materializes per-opcode views from
//!   a lifted [`TACProgram`](vandal_types::TACProgram), resolving the
//!   depth→address map along the way;
//! - the [`OpView`](view::OpView) algebra: filter, link, link-local
//!   predicates over values and the variable dependency graph, and result
//!   materialization;
//! - the [`Heuristic`](heuristics::Heuristic) trait and the four built-in
//!   rules: reentrancy, timestamp dependency, unchecked call, failed send.
//!
//! Each heuristic declares the opcodes it needs; the driver loads the union
//! once per trace and hands every heuristic a fresh view set.

pub mod errors;
pub mod heuristics;
pub mod loader;
pub mod meta_op;
pub mod results;
pub mod view;

pub use errors::QueryError;
pub use heuristics::{FailedSend, Heuristic, Reentrancy, TimestampDependency, UncheckedCall};
pub use loader::OpLoader;
pub use meta_op::{MetaOp, OpAttr, VarSlot};
pub use results::{Results, RowOp};
pub use view::{AddressAction, Cmp, LinkFilter, OpFilter, OpView, Relation};

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use vandal_types::FastHashSet;

/// The compile-time heuristic registry, addressable by the snake_case names
/// the CLI accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Heuristics {
    Reentrancy,
    Timestamp,
    UncheckedCall,
    FailedSend,
}

impl Heuristics {
    pub fn init(self) -> Box<dyn Heuristic> {
        match self {
            Heuristics::Reentrancy => Box::new(Reentrancy),
            Heuristics::Timestamp => Box::new(TimestampDependency),
            Heuristics::UncheckedCall => Box::new(UncheckedCall),
            Heuristics::FailedSend => Box::new(FailedSend),
        }
    }

    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

/// The union of required opcodes across a heuristic set, as handed to the
/// loader.
pub fn required_op_union(heuristics: &[Box<dyn Heuristic>]) -> FastHashSet<&'static str> {
    heuristics
        .iter()
        .flat_map(|h| h.required_ops().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn registry_round_trips_cli_names() {
        for heuristic in Heuristics::all() {
            let name = heuristic.to_string();
            assert_eq!(Heuristics::from_str(&name).unwrap(), heuristic);
        }
        assert_eq!(Heuristics::from_str("unchecked_call").unwrap(), Heuristics::UncheckedCall);
        assert!(Heuristics::from_str("sandwich").is_err());
    }

    #[test]
    fn registry_names_match_heuristic_names() {
        for heuristic in Heuristics::all() {
            assert_eq!(heuristic.to_string(), heuristic.init().name());
        }
    }

    #[test]
    fn required_union_covers_all_rules() {
        let set: Vec<_> = Heuristics::all().into_iter().map(Heuristics::init).collect();
        let union = required_op_union(&set);
        for op in ["SLOAD", "SSTORE", "JUMPI", "CALL", "REVERT", "TIMESTAMP"] {
            assert!(union.contains(op), "{op} missing from union");
        }
    }
}
