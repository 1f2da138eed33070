#![deny(unused_imports)]

pub mod blocks;
pub mod decoding;
pub mod errors;
pub mod feed;
pub mod lift;
pub mod provider;

pub use blocks::partition_blocks;
pub use decoding::{decode_trace, VandalTrace};
pub use errors::TraceError;
pub use feed::TraceFeed;
pub use lift::{lift_trace, Destackifier};
pub use provider::{BlockSpec, BlockTxs, GethIpcProvider, TraceProvider};
