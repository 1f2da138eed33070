//! Timestamp dependency: the block timestamp flows into a top-level branch
//! condition.

use crate::{
    errors::QueryError,
    heuristics::Heuristic,
    loader::OpLoader,
    meta_op::VarSlot,
    results::Results,
    view::{LinkFilter, OpFilter},
};

pub struct TimestampDependency;

impl Heuristic for TimestampDependency {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn required_ops(&self) -> &'static [&'static str] {
        &["TIMESTAMP", "JUMPI"]
    }

    fn analyze(&self, api: &OpLoader<'_>) -> Result<Results, QueryError> {
        let Some(mut timestamp) = api.get_ops("TIMESTAMP", &[OpFilter::depth_eq(1)]) else {
            return Ok(Results::empty())
        };
        let Some(jumpi) = api.get_ops("JUMPI", &[OpFilter::depth_eq(1)]) else {
            return Ok(Results::empty())
        };

        timestamp.link(&jumpi, &[LinkFilter::OP_INDEX_LT]);
        timestamp.is_descendant(VarSlot::Value, VarSlot::Destination)?;

        Ok(timestamp.get_results(&[]))
    }
}
