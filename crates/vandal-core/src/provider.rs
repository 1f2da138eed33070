//! The Geth IPC trace source.
//!
//! One non-standard endpoint, `debug_traceVandalTransaction`, returns the
//! linearized op trace; block enumeration goes through
//! `eth_getBlockByNumber` with hashes only.

use std::{path::Path, str::FromStr};

use alloy_primitives::{B256, U64};
use alloy_pubsub::PubSubFrontend;
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_transport_ipc::IpcConnect;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{decoding::VandalTrace, errors::TraceError};

/// A block height selector for the streaming start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSpec {
    Latest,
    Number(u64),
}

impl BlockSpec {
    fn as_tag(&self) -> String {
        match self {
            BlockSpec::Latest => "latest".to_string(),
            BlockSpec::Number(n) => format!("0x{n:x}"),
        }
    }
}

impl FromStr for BlockSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "latest" {
            return Ok(BlockSpec::Latest)
        }
        s.parse()
            .map(BlockSpec::Number)
            .map_err(|_| format!("expected a block number or `latest`, got `{s}`"))
    }
}

impl std::fmt::Display for BlockSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockSpec::Latest => f.write_str("latest"),
            BlockSpec::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A resolved block: its height and transaction hashes in block order.
#[derive(Debug, Clone)]
pub struct BlockTxs {
    pub number: u64,
    pub txs: Vec<B256>,
}

/// The node interface the driver and feed workers consume. Object-safe so
/// tests can swap in a canned provider.
#[async_trait]
pub trait TraceProvider: Send + Sync + 'static {
    async fn block_txs(&self, block: BlockSpec) -> Result<BlockTxs, TraceError>;

    async fn vandal_trace(&self, tx_hash: B256) -> Result<VandalTrace, TraceError>;
}

#[derive(Debug, Clone, Deserialize)]
struct RpcBlock {
    number: U64,
    transactions: Vec<B256>,
}

/// JSON-RPC over the node's IPC socket.
pub struct GethIpcProvider {
    client: RpcClient<PubSubFrontend>,
}

impl GethIpcProvider {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let client = ClientBuilder::default()
            .ipc(IpcConnect::new(path.as_ref().to_path_buf()))
            .await
            .map_err(|e| TraceError::Rpc(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TraceProvider for GethIpcProvider {
    async fn block_txs(&self, block: BlockSpec) -> Result<BlockTxs, TraceError> {
        let response: Option<RpcBlock> = self
            .client
            .request("eth_getBlockByNumber", (block.as_tag(), false))
            .await
            .map_err(|e| TraceError::Rpc(e.to_string()))?;

        let block = response.ok_or(match block {
            BlockSpec::Number(n) => TraceError::BlockNotFound(n),
            BlockSpec::Latest => TraceError::Rpc("node has no latest block".to_string()),
        })?;

        Ok(BlockTxs { number: block.number.to::<u64>(), txs: block.transactions })
    }

    async fn vandal_trace(&self, tx_hash: B256) -> Result<VandalTrace, TraceError> {
        let mut trace: VandalTrace = self
            .client
            .request("debug_traceVandalTransaction", (tx_hash,))
            .await
            .map_err(|e| TraceError::Rpc(e.to_string()))?;
        trace.tx_hash = tx_hash;
        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_spec_parses() {
        assert_eq!("latest".parse::<BlockSpec>().unwrap(), BlockSpec::Latest);
        assert_eq!("18522278".parse::<BlockSpec>().unwrap(), BlockSpec::Number(18522278));
        assert!("0xff".parse::<BlockSpec>().is_err());
        assert!("tip".parse::<BlockSpec>().is_err());
    }

    #[test]
    fn block_spec_tags() {
        assert_eq!(BlockSpec::Latest.as_tag(), "latest");
        assert_eq!(BlockSpec::Number(255).as_tag(), "0xff");
    }
}
