//! Upstream adapters
//!
//! The aggregator only sees these two traits. Production code plugs in the
//! HTTP clients from [`execution`] and [`beacon`]; tests plug in fakes.

pub mod beacon;
pub mod execution;

pub use beacon::BeaconClient;
pub use execution::JsonRpcExecutionClient;

use async_trait::async_trait;

use crate::block::Block;
use crate::consensus::{Epoch, SlotHeader};
use crate::error::Result;
use crate::transaction::{Transaction, TxHash};

/// Execution-layer queries (JSON-RPC node).
#[async_trait]
pub trait ExecutionSource: Send + Sync {
    /// Head block, transaction hashes only.
    async fn latest_block(&self) -> Result<Block>;

    /// `Ok(None)` when the node has no block at `number`.
    async fn block_by_number(&self, number: u64) -> Result<Option<Block>>;

    /// `Ok(None)` when the node does not know the transaction.
    async fn transaction(&self, hash: &TxHash) -> Result<Option<Transaction>>;
}

/// Consensus-layer queries (beacon REST endpoints).
#[async_trait]
pub trait ConsensusSource: Send + Sync {
    async fn latest_epoch(&self) -> Result<Epoch>;

    async fn slots(&self, epoch: u64) -> Result<Vec<SlotHeader>>;

    /// At most `limit` headers, most recent first, never padded.
    async fn recent_headers(&self, limit: usize) -> Result<Vec<SlotHeader>>;

    /// At most `limit` epochs, most recent first, never padded. Ages the
    /// upstream reports relative to "now" are anchored at `now` (unix seconds).
    async fn recent_epochs(&self, limit: usize, now: i64) -> Result<Vec<Epoch>>;

    /// Slot of the most recent header.
    async fn current_slot(&self) -> Result<u64>;
}
