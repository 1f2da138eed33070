//! Streaming trace acquisition: a block poller and a trace fetcher wired
//! with bounded queues.
//!
//! The poller enumerates blocks from the starting height and enqueues
//! transaction hashes; the fetcher resolves each hash into a Vandal trace.
//! Block-not-found (the chain tip) retries with exponential backoff, 2s
//! doubling per attempt; once the backoff budget is exhausted the poller
//! exits and the closed channels drain through to the analyzer.

use std::{sync::Arc, time::Duration};

use alloy_primitives::B256;
use backon::{ExponentialBuilder, Retryable};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    decoding::VandalTrace,
    errors::TraceError,
    provider::{BlockSpec, TraceProvider},
};

const TX_QUEUE_CAPACITY: usize = 1024;
const TRACE_QUEUE_CAPACITY: usize = 64;

fn poll_backoff() -> ExponentialBuilder {
    // 2s * 2^k for 10 attempts, ~17 minutes in total before giving up
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(2))
        .with_factor(2.0)
        .with_max_delay(Duration::from_secs(1024))
        .with_max_times(10)
}

/// Spawns the streaming workers and hands back the completed-trace queue.
pub struct TraceFeed<P: TraceProvider> {
    provider: Arc<P>,
    start: BlockSpec,
}

impl<P: TraceProvider> TraceFeed<P> {
    pub fn new(provider: Arc<P>, start: BlockSpec) -> Self {
        Self { provider, start }
    }

    pub fn spawn(self) -> mpsc::Receiver<VandalTrace> {
        let (hash_tx, hash_rx) = mpsc::channel(TX_QUEUE_CAPACITY);
        let (trace_tx, trace_rx) = mpsc::channel(TRACE_QUEUE_CAPACITY);

        tokio::spawn(poll_blocks(self.provider.clone(), self.start, hash_tx));
        tokio::spawn(fetch_traces(self.provider, hash_rx, trace_tx));

        trace_rx
    }
}

async fn poll_blocks<P: TraceProvider>(
    provider: Arc<P>,
    start: BlockSpec,
    queue: mpsc::Sender<B256>,
) {
    // the starting block resolves without retry; a missing start height is
    // an operator error
    let first = match provider.block_txs(start).await {
        Ok(block) => block,
        Err(err) => {
            error!(target: "vandal::feed", %err, %start, "failed to resolve starting block");
            return
        }
    };
    info!(target: "vandal::feed", block = first.number, txs = first.txs.len(), "poller started");

    let mut next = first.number;
    let mut txs = first.txs;
    loop {
        for tx in txs {
            if queue.send(tx).await.is_err() {
                return
            }
        }
        next += 1;

        let number = next;
        let fetch = || provider.block_txs(BlockSpec::Number(number));
        match fetch
            .retry(&poll_backoff())
            .when(|err| matches!(err, TraceError::BlockNotFound(_)))
            .notify(|err, after| {
                debug!(target: "vandal::feed", %err, ?after, "block not ready, backing off")
            })
            .await
        {
            Ok(block) => txs = block.txs,
            Err(err) => {
                error!(target: "vandal::feed", %err, block = number, "giving up polling");
                return
            }
        }
    }
}

async fn fetch_traces<P: TraceProvider>(
    provider: Arc<P>,
    mut hashes: mpsc::Receiver<B256>,
    traces: mpsc::Sender<VandalTrace>,
) {
    while let Some(tx_hash) = hashes.recv().await {
        match provider.vandal_trace(tx_hash).await {
            Ok(trace) if trace.optrace.is_some() && trace.ops.is_some() => {
                if traces.send(trace).await.is_err() {
                    return
                }
            }
            Ok(_) => debug!(target: "vandal::feed", %tx_hash, "no ops in trace, skipping"),
            Err(err) => warn!(target: "vandal::feed", %tx_hash, %err, "trace fetch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use async_trait::async_trait;

    use super::*;
    use crate::provider::BlockTxs;

    struct CannedProvider {
        head: u64,
    }

    #[async_trait]
    impl TraceProvider for CannedProvider {
        async fn block_txs(&self, block: BlockSpec) -> Result<BlockTxs, TraceError> {
            let number = match block {
                BlockSpec::Latest => self.head,
                BlockSpec::Number(n) if n <= self.head => n,
                BlockSpec::Number(n) => return Err(TraceError::BlockNotFound(n)),
            };
            Ok(BlockTxs { number, txs: vec![B256::with_last_byte(number as u8)] })
        }

        async fn vandal_trace(&self, tx_hash: B256) -> Result<VandalTrace, TraceError> {
            Ok(VandalTrace {
                to: Address::ZERO,
                optrace: Some("0,0,1,STOP,_,_,0x".to_string()),
                ops: Some(1),
                tx_hash,
            })
        }
    }

    #[tokio::test]
    async fn feed_streams_traces_in_block_order() {
        let provider = Arc::new(CannedProvider { head: 3 });
        let mut traces = TraceFeed::new(provider, BlockSpec::Number(1)).spawn();

        let first = traces.recv().await.unwrap();
        assert_eq!(first.tx_hash, B256::with_last_byte(1));
        let second = traces.recv().await.unwrap();
        assert_eq!(second.tx_hash, B256::with_last_byte(2));
        let third = traces.recv().await.unwrap();
        assert_eq!(third.tx_hash, B256::with_last_byte(3));
    }

    #[tokio::test]
    async fn fetcher_sets_tx_hash() {
        let provider = Arc::new(CannedProvider { head: 1 });
        let mut traces = TraceFeed::new(provider, BlockSpec::Latest).spawn();
        let trace = traces.recv().await.unwrap();
        assert_eq!(trace.tx_hash, B256::with_last_byte(1));
        assert!(trace.optrace.is_some());
    }
}
