//! Transaction lookup types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::derivation::{normalize_wide_int, parse_hex_u64, WideInt};
use crate::error::{ExplorerError, Result};

/// A validated 32-byte transaction hash, lowercase with `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(String);

impl TxHash {
    /// Accepts 64 hex characters with or without a leading `0x`.
    pub fn parse(input: &str) -> Result<Self> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if digits.len() != 64 {
            return Err(ExplorerError::InvalidInput(
                "Transaction hash must be 32 bytes of hex (64 characters)".to_string(),
            ));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| ExplorerError::InvalidInput(format!("Invalid hex hash: {}", e)))?;
        Ok(TxHash(format!("0x{}", hex::encode(bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `eth_getTransactionByHash` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<String>,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub value: WideInt,
    pub gas: WideInt,
    #[serde(default)]
    pub gas_price: Option<WideInt>,
    #[serde(default)]
    pub max_fee_per_gas: Option<WideInt>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<WideInt>,
    pub nonce: String,
    pub input: String,
    #[serde(default, rename = "type")]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub chain_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    /// `None` while the transaction is still pending.
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub gas: String,
    pub gas_price: Option<String>,
    pub max_fee_per_gas: Option<String>,
    pub max_priority_fee_per_gas: Option<String>,
    pub nonce: u64,
    pub input: String,
    #[serde(rename = "type")]
    pub tx_type: Option<u64>,
    pub chain_id: Option<u64>,
}

fn optional_u64(field: &str, value: Option<String>) -> std::result::Result<Option<u64>, String> {
    value
        .map(|v| parse_hex_u64(&v).map_err(|e| format!("{}: {}", field, e)))
        .transpose()
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = String;

    fn try_from(raw: RawTransaction) -> std::result::Result<Self, Self::Error> {
        Ok(Transaction {
            block_number: optional_u64("blockNumber", raw.block_number)?,
            transaction_index: optional_u64("transactionIndex", raw.transaction_index)?,
            nonce: parse_hex_u64(&raw.nonce).map_err(|e| format!("nonce: {}", e))?,
            tx_type: optional_u64("type", raw.tx_type)?,
            chain_id: optional_u64("chainId", raw.chain_id)?,
            hash: raw.hash,
            block_hash: raw.block_hash,
            from: raw.from,
            to: raw.to,
            value: raw.value.to_string(),
            gas: raw.gas.to_string(),
            gas_price: normalize_wide_int(raw.gas_price),
            max_fee_per_gas: normalize_wide_int(raw.max_fee_per_gas),
            max_priority_fee_per_gas: normalize_wide_int(raw.max_priority_fee_per_gas),
            input: raw.input,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    pub(crate) const SAMPLE_HASH: &str =
        "0xff174eb9ce8c4d6ac7f3e3e92ea715d8a779cb065ed5030ec1992fd452969572";

    pub(crate) fn sample_transaction_json() -> Value {
        json!({
            "hash": SAMPLE_HASH,
            "blockHash": "0x9b83c12c69edb74f6c8dd5d052765c1adf940e320bd1291696e6fa07829eee71",
            "blockNumber": "0x1312d00",
            "transactionIndex": "0x3",
            "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
            "to": "0xf02c1c8e6114b1dbe8937a39260b5b0a374432bb",
            "value": "0xde0b6b3a7640000000",
            "gas": "0x5208",
            "gasPrice": "0x4a817c800",
            "maxFeePerGas": "0x4a817c800",
            "maxPriorityFeePerGas": "0x3b9aca00",
            "nonce": "0x15",
            "input": "0x",
            "type": "0x2",
            "chainId": "0x1"
        })
    }

    #[test]
    fn test_tx_hash_parse() {
        let hash = TxHash::parse(SAMPLE_HASH).unwrap();
        assert_eq!(hash.as_str(), SAMPLE_HASH);

        let upper = SAMPLE_HASH.trim_start_matches("0x").to_uppercase();
        assert_eq!(TxHash::parse(&upper).unwrap().as_str(), SAMPLE_HASH);
    }

    #[test]
    fn test_tx_hash_rejects_malformed() {
        let non_hex = format!("0x{}", "zz".repeat(32));
        for bad in ["", "0x", "0x1234", "not-a-hash", non_hex.as_str()] {
            let err = TxHash::parse(bad).unwrap_err();
            assert!(matches!(err, ExplorerError::InvalidInput(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_transaction_from_raw() {
        let raw: RawTransaction = serde_json::from_value(sample_transaction_json()).unwrap();
        let tx = Transaction::try_from(raw).unwrap();

        assert_eq!(tx.block_number, Some(20_000_000));
        assert_eq!(tx.transaction_index, Some(3));
        assert_eq!(tx.nonce, 21);
        // 256 ether in wei, beyond u64
        assert_eq!(tx.value, "256000000000000000000");
        assert_eq!(tx.gas, "21000");
        assert_eq!(tx.max_priority_fee_per_gas.as_deref(), Some("1000000000"));
        assert_eq!(tx.tx_type, Some(2));
    }

    #[test]
    fn test_pending_transaction() {
        let mut value = sample_transaction_json();
        value["blockHash"] = Value::Null;
        value["blockNumber"] = Value::Null;
        value["transactionIndex"] = Value::Null;

        let raw: RawTransaction = serde_json::from_value(value).unwrap();
        let tx = Transaction::try_from(raw).unwrap();
        assert_eq!(tx.block_hash, None);
        assert_eq!(tx.block_number, None);
    }
}
