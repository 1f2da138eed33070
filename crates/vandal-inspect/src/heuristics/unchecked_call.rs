//! Unchecked call: a top-level call whose success flag never reaches a
//! branch condition in the calling frame.

use crate::{
    errors::QueryError,
    heuristics::Heuristic,
    loader::OpLoader,
    meta_op::VarSlot,
    results::Results,
    view::{LinkFilter, OpFilter, Relation},
};

pub struct UncheckedCall;

impl Heuristic for UncheckedCall {
    fn name(&self) -> &'static str {
        "unchecked_call"
    }

    fn required_ops(&self) -> &'static [&'static str] {
        &["CALL", "JUMPI"]
    }

    fn analyze(&self, api: &OpLoader<'_>) -> Result<Results, QueryError> {
        let Some(mut call) = api.get_ops("CALL", &[OpFilter::depth_eq(1)]) else {
            return Ok(Results::empty())
        };
        let Some(jumpi) = api.get_ops("JUMPI", &[OpFilter::depth_eq(1)]) else {
            return Ok(Results::empty())
        };

        call.link(&jumpi, &[LinkFilter::DEPTH_EQ, LinkFilter::CALL_INDEX_EQ]);
        // drop the branches that do test the flag; calls with none left over
        // were never checked
        call.is_relation(VarSlot::Success, VarSlot::Destination, Relation::Descendants, true)?;

        Ok(call.get_results(&[]))
    }
}
