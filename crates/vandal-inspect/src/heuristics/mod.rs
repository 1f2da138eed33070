//! The vulnerability rules, each written as a chain over the view algebra.

pub mod failed_send;
pub mod reentrancy;
pub mod timestamp;
pub mod unchecked_call;

pub use failed_send::FailedSend;
pub use reentrancy::Reentrancy;
pub use timestamp::TimestampDependency;
pub use unchecked_call::UncheckedCall;

use crate::{errors::QueryError, loader::OpLoader, results::Results};

/// A single vulnerability rule. `required_ops` declares the collapsed
/// opcode names the loader must materialize; a trace that never executed
/// one of them yields empty results rather than an error.
pub trait Heuristic: Send + Sync {
    fn name(&self) -> &'static str;

    fn required_ops(&self) -> &'static [&'static str];

    /// Projection applied when serializing results; empty for the base
    /// attribute tuple.
    fn output_keys(&self) -> &'static [&'static str] {
        &[]
    }

    fn analyze(&self, api: &OpLoader<'_>) -> Result<Results, QueryError>;
}
