//! Execution-layer block as served by the explorer
//!
//! `RawBlock` mirrors the JSON-RPC `eth_getBlockByNumber` result with
//! transaction hashes only; `Block` is the normalized record with every wide
//! quantity rendered as a decimal string.

use serde::{Deserialize, Serialize};

use crate::derivation::{normalize_wide_int, parse_hex_u64, WideInt};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub hash: String,
    pub number: String,
    pub parent_hash: String,
    pub timestamp: String,
    pub gas_limit: WideInt,
    pub gas_used: WideInt,
    #[serde(default)]
    pub base_fee_per_gas: Option<WideInt>,
    #[serde(default)]
    pub blob_gas_used: Option<WideInt>,
    #[serde(default)]
    pub excess_blob_gas: Option<WideInt>,
    #[serde(default)]
    pub difficulty: Option<WideInt>,
    pub miner: String,
    pub state_root: String,
    pub receipts_root: String,
    pub extra_data: String,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub mix_hash: Option<String>,
    #[serde(default)]
    pub parent_beacon_block_root: Option<String>,
    #[serde(default)]
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub hash: String,
    pub number: u64,
    pub parent_hash: String,
    pub timestamp: u64,
    pub gas_limit: String,
    pub gas_used: String,
    pub base_fee_per_gas: Option<String>,
    pub blob_gas_used: Option<String>,
    pub excess_blob_gas: Option<String>,
    pub difficulty: Option<String>,
    pub miner: String,
    pub state_root: String,
    pub receipts_root: String,
    pub extra_data: String,
    pub nonce: Option<String>,
    pub prev_randao: Option<String>,
    pub parent_beacon_block_root: Option<String>,
    /// Hashes only, in block order.
    pub transactions: Vec<String>,
}

impl TryFrom<RawBlock> for Block {
    type Error = String;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let number = parse_hex_u64(&raw.number).map_err(|e| format!("block number: {}", e))?;
        let timestamp =
            parse_hex_u64(&raw.timestamp).map_err(|e| format!("block timestamp: {}", e))?;

        Ok(Block {
            hash: raw.hash,
            number,
            parent_hash: raw.parent_hash,
            timestamp,
            gas_limit: raw.gas_limit.to_string(),
            gas_used: raw.gas_used.to_string(),
            base_fee_per_gas: normalize_wide_int(raw.base_fee_per_gas),
            blob_gas_used: normalize_wide_int(raw.blob_gas_used),
            excess_blob_gas: normalize_wide_int(raw.excess_blob_gas),
            difficulty: normalize_wide_int(raw.difficulty),
            miner: raw.miner,
            state_root: raw.state_root,
            receipts_root: raw.receipts_root,
            extra_data: raw.extra_data,
            nonce: raw.nonce,
            prev_randao: raw.mix_hash,
            parent_beacon_block_root: raw.parent_beacon_block_root,
            transactions: raw.transactions,
        })
    }
}
