//! Aggregator
//!
//! Orchestrates the execution and consensus adapters, runs the derivation
//! engine over their output and assembles the explorer payloads. Which
//! upstreams are available is decided once, at construction, through
//! [`Upstreams`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::block::Block;
use crate::config::{Config, Mode};
use crate::consensus::{EpochSummary, SlotHeader};
use crate::derivation::{
    canonical_status, epoch_progress, finality_label, relative_time, slot_to_epoch, EpochProgress,
};
use crate::error::{ExplorerError, Result, Upstream};
use crate::transaction::{Transaction, TxHash};
use crate::upstream::{BeaconClient, ConsensusSource, ExecutionSource, JsonRpcExecutionClient};

pub const DEFAULT_RECENT_LIMIT: usize = 5;
pub const DEFAULT_BLOCK_WALK: u64 = 10;
pub const DEFAULT_MAX_BLOCK_WALK: u64 = 50;

/// Upstream capability set chosen at construction time.
#[derive(Clone)]
pub enum Upstreams {
    ExecutionOnly(Arc<dyn ExecutionSource>),
    Full {
        execution: Arc<dyn ExecutionSource>,
        consensus: Arc<dyn ConsensusSource>,
    },
}

// ============================================================================
// Payloads
// ============================================================================

/// Block, epoch and the epoch's slots presented as one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct LatestSnapshot {
    pub epoch: EpochSummary,
    pub block: Block,
    pub slots: Vec<SlotHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub current_epoch: u64,
    pub current_slot: u64,
    pub epoch_progress: EpochProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentEpoch {
    pub epoch: u64,
    pub time: String,
    pub finalized: &'static str,
    pub eligible: Option<String>,
    pub voted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentBlock {
    pub epoch: u64,
    pub slot: u64,
    /// Beacon block body root.
    pub block: String,
    pub status: &'static str,
    pub time: String,
    pub proposer: u64,
}

// ============================================================================
// Aggregator
// ============================================================================

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Clone)]
pub struct Aggregator {
    upstreams: Upstreams,
    recent_limit: usize,
    max_block_walk: u64,
    clock: fn() -> i64,
}

impl Aggregator {
    pub fn new(upstreams: Upstreams) -> Self {
        Self {
            upstreams,
            recent_limit: DEFAULT_RECENT_LIMIT,
            max_block_walk: DEFAULT_MAX_BLOCK_WALK,
            clock: system_clock,
        }
    }

    /// Builds the HTTP adapters described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let execution: Arc<dyn ExecutionSource> = Arc::new(JsonRpcExecutionClient::new(
            config.execution.rpc_url.clone(),
            config.execution.timeout(),
        )?);

        let upstreams = match config.server.mode {
            Mode::ExecutionOnly => Upstreams::ExecutionOnly(execution),
            Mode::Full => Upstreams::Full {
                execution,
                consensus: Arc::new(BeaconClient::new(
                    config.consensus.node_url.clone(),
                    config.consensus.explorer_url.clone(),
                    config.consensus.timeout(),
                )?),
            },
        };

        info!(
            mode = ?config.server.mode,
            execution = %config.execution.rpc_url,
            "aggregator.configured"
        );

        Ok(Self::new(upstreams)
            .with_limits(config.explorer.recent_limit, config.explorer.max_block_walk))
    }

    pub fn with_limits(mut self, recent_limit: usize, max_block_walk: u64) -> Self {
        self.recent_limit = recent_limit;
        self.max_block_walk = max_block_walk;
        self
    }

    /// Replaces the wall clock (unix seconds) used for relative times.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_consensus(&self) -> bool {
        matches!(self.upstreams, Upstreams::Full { .. })
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    fn execution(&self) -> &dyn ExecutionSource {
        match &self.upstreams {
            Upstreams::ExecutionOnly(execution) => execution.as_ref(),
            Upstreams::Full { execution, .. } => execution.as_ref(),
        }
    }

    fn consensus(&self) -> Result<&dyn ConsensusSource> {
        match &self.upstreams {
            Upstreams::ExecutionOnly(_) => Err(ExplorerError::ConsensusDisabled),
            Upstreams::Full { consensus, .. } => Ok(consensus.as_ref()),
        }
    }

    pub async fn latest_block(&self) -> Result<Block> {
        self.execution().latest_block().await
    }

    /// `Ok(None)` when the hash is well formed but unknown upstream.
    pub async fn transaction(&self, hash: &str) -> Result<Option<Transaction>> {
        let hash = TxHash::parse(hash)?;
        self.execution().transaction(&hash).await
    }

    /// Head block alongside the latest epoch and its slots.
    ///
    /// The block fetch runs next to the epoch → slots chain. Any failure fails
    /// the whole snapshot; the pieces are never returned separately.
    pub async fn latest_snapshot(&self) -> Result<LatestSnapshot> {
        let consensus = self.consensus()?;

        let epoch_and_slots = async {
            let epoch = consensus.latest_epoch().await?;
            let slots = consensus.slots(epoch.epoch).await?;
            Ok::<_, ExplorerError>((epoch, slots))
        };

        let (block, (epoch, slots)) =
            tokio::try_join!(self.execution().latest_block(), epoch_and_slots)?;

        debug!(
            block = block.number,
            epoch = epoch.epoch,
            slots = slots.len(),
            "aggregator.snapshot"
        );

        Ok(LatestSnapshot {
            epoch: EpochSummary::from(&epoch),
            block,
            slots,
        })
    }

    pub async fn epoch_info(&self) -> Result<EpochInfo> {
        let current_slot = self.consensus()?.current_slot().await?;
        Ok(EpochInfo {
            current_epoch: slot_to_epoch(current_slot),
            current_slot,
            epoch_progress: epoch_progress(current_slot),
        })
    }

    pub async fn recent_epochs(&self) -> Result<Vec<RecentEpoch>> {
        let now = (self.clock)();
        let epochs = self
            .consensus()?
            .recent_epochs(self.recent_limit, now)
            .await?;

        Ok(epochs
            .into_iter()
            .take(self.recent_limit)
            .map(|epoch| RecentEpoch {
                epoch: epoch.epoch,
                time: relative_time(epoch.time, now),
                finalized: finality_label(epoch.finalized),
                eligible: epoch.eligible_ether,
                voted: epoch.voted_ether,
            })
            .collect())
    }

    pub async fn recent_blocks(&self) -> Result<Vec<RecentBlock>> {
        let headers = self
            .consensus()?
            .recent_headers(self.recent_limit)
            .await?;
        let now = (self.clock)();

        Ok(headers
            .into_iter()
            .take(self.recent_limit)
            .map(|header| RecentBlock {
                epoch: header.epoch,
                slot: header.slot,
                block: header.body_root,
                status: canonical_status(header.canonical),
                time: relative_time(header.timestamp, now),
                proposer: header.proposer_index,
            })
            .collect())
    }

    /// The head block and its predecessors, newest first.
    ///
    /// `count` defaults to [`DEFAULT_BLOCK_WALK`] when absent or zero and is
    /// clamped to `..=max_block_walk`; the walk stops early at genesis.
    /// Blocks are fetched one after another.
    pub async fn latest_blocks(&self, count: Option<u64>) -> Result<Vec<Block>> {
        let count = count
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_BLOCK_WALK)
            .clamp(1, self.max_block_walk.max(1));

        let head = self.latest_block().await?;
        let count = count.min(head.number.saturating_add(1));
        let mut blocks = Vec::with_capacity(count as usize);
        let head_number = head.number;
        blocks.push(head);

        for offset in 1..count {
            let number = head_number - offset;
            let block = self.execution().block_by_number(number).await?.ok_or_else(|| {
                ExplorerError::malformed(
                    Upstream::Execution,
                    format!("block {} below head {} is missing", number, head_number),
                )
            })?;
            blocks.push(block);
        }

        Ok(blocks)
    }
}
