//! Reentrancy: a storage slot is read and branched on inside a re-entered
//! frame while an earlier frame of the same contract later writes the same
//! slot.

use crate::{
    errors::QueryError,
    heuristics::Heuristic,
    loader::OpLoader,
    meta_op::{OpAttr, VarSlot},
    results::Results,
    view::{AddressAction, Cmp, LinkFilter, OpFilter},
};

pub struct Reentrancy;

impl Heuristic for Reentrancy {
    fn name(&self) -> &'static str {
        "reentrancy"
    }

    fn required_ops(&self) -> &'static [&'static str] {
        &["SLOAD", "JUMPI", "SSTORE"]
    }

    fn output_keys(&self) -> &'static [&'static str] {
        &[
            "SLOAD.op_index",
            "JUMPI.op_index",
            "SLOAD.depth",
            "SLOAD.call_index",
            "SSTORE.op_index",
            "SSTORE.call_index",
            "SSTORE.address",
            "SLOAD.address",
        ]
    }

    fn analyze(&self, api: &OpLoader<'_>) -> Result<Results, QueryError> {
        let Some(mut sload) = api.get_ops("SLOAD", &[OpFilter::depth_gt(2)]) else {
            return Ok(Results::empty())
        };
        let Some(jumpi) = api.get_ops("JUMPI", &[]) else { return Ok(Results::empty()) };

        // the loaded word must feed a branch in the same frame
        sload.link(&jumpi, &[LinkFilter::CALL_INDEX_EQ, LinkFilter::DEPTH_EQ]);
        sload.is_descendant(VarSlot::Value, VarSlot::Destination)?;

        let Some(sstore) = api.get_ops("SSTORE", &[]) else { return Ok(Results::empty()) };

        // a later write of the same slot, at least two frames up the call
        // stack (the prior JUMPI links are kept for the result rows)
        sload.link(
            &sstore,
            &[LinkFilter::biased(OpAttr::Depth, Cmp::Ge, 2), LinkFilter::OP_INDEX_LT],
        );
        sload.is_value(VarSlot::Key, VarSlot::Key, Cmp::Eq)?;

        // read and write must happen in the same executing contract
        sload.source_address(AddressAction::Eq)?;

        Ok(sload.get_results(self.output_keys()))
    }
}
