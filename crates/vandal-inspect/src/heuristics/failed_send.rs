//! Failed send: a value-bearing top-level call fails, and the failure flag
//! is branched on ahead of a revert.

use alloy_primitives::U256;

use crate::{
    errors::QueryError,
    heuristics::Heuristic,
    loader::OpLoader,
    meta_op::VarSlot,
    results::Results,
    view::{Cmp, LinkFilter, OpFilter},
};

pub struct FailedSend;

impl Heuristic for FailedSend {
    fn name(&self) -> &'static str {
        "failed_send"
    }

    fn required_ops(&self) -> &'static [&'static str] {
        &["REVERT", "CALL", "JUMPI"]
    }

    fn analyze(&self, api: &OpLoader<'_>) -> Result<Results, QueryError> {
        let depth_one = [OpFilter::depth_eq(1)];
        let Some(revert) = api.get_ops("REVERT", &depth_one) else {
            return Ok(Results::empty())
        };
        let Some(mut call) = api.get_ops("CALL", &depth_one) else {
            return Ok(Results::empty())
        };
        let Some(mut jumpi) = api.get_ops("JUMPI", &depth_one) else {
            return Ok(Results::empty())
        };

        // a send: wei attached, success flag zero
        call.is_value_literal(VarSlot::CallValue, U256::ZERO, Cmp::Ne);
        call.is_value_literal(VarSlot::Success, U256::ZERO, Cmp::Eq);

        // the branch sits between the failed call and the revert, and tests
        // something derived from the success flag
        jumpi.link(&revert, &[LinkFilter::OP_INDEX_LT]);
        jumpi.link(&call, &[LinkFilter::OP_INDEX_GT]);
        jumpi.is_ancestor(VarSlot::Destination, VarSlot::Success)?;

        Ok(jumpi.get_results(&[]))
    }
}
