//! Beacon-chain records: epochs and slot headers
//!
//! The beacon endpoints are loosely structured. Standard node routes quote
//! every integer (`"slot": "123"`) while explorer routes use plain JSON
//! numbers, so the raw types below accept both.

use chrono::DateTime;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::derivation::{normalize_wide_int, slot_to_epoch, WideInt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub epoch: u64,
    /// Unix seconds.
    pub time: Option<u64>,
    pub eligible_ether: Option<String>,
    pub voted_ether: Option<String>,
    pub finalized: bool,
}

/// The epoch part of the latest-snapshot view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSummary {
    pub epoch: u64,
    pub time: Option<u64>,
    pub eligible_ether: Option<String>,
    pub voted_ether: Option<String>,
}

impl From<&Epoch> for EpochSummary {
    fn from(epoch: &Epoch) -> Self {
        EpochSummary {
            epoch: epoch.epoch,
            time: epoch.time,
            eligible_ether: epoch.eligible_ether.clone(),
            voted_ether: epoch.voted_ether.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotHeader {
    pub slot: u64,
    pub epoch: u64,
    pub body_root: String,
    pub proposer_index: u64,
    pub canonical: bool,
    /// Unix seconds, when the upstream reports one.
    pub timestamp: Option<u64>,
}

impl SlotHeader {
    pub fn new(
        slot: u64,
        body_root: String,
        proposer_index: u64,
        canonical: bool,
        timestamp: Option<u64>,
    ) -> Self {
        SlotHeader {
            slot,
            epoch: slot_to_epoch(slot),
            body_root,
            proposer_index,
            canonical,
            timestamp,
        }
    }
}

// ============================================================================
// Upstream shapes
// ============================================================================

/// `{ "data": ... }` wrapper shared by every beacon route.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Explorer `/api/v1/epoch/latest` payload.
#[derive(Debug, Deserialize)]
pub struct RawExplorerEpoch {
    #[serde(deserialize_with = "quoted_u64")]
    pub epoch: u64,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub ts: Option<u64>,
    #[serde(default)]
    pub eligibleether: Option<WideInt>,
    #[serde(default)]
    pub votedether: Option<WideInt>,
    #[serde(default)]
    pub finalized: bool,
}

impl From<RawExplorerEpoch> for Epoch {
    fn from(raw: RawExplorerEpoch) -> Self {
        Epoch {
            epoch: raw.epoch,
            time: raw.ts,
            eligible_ether: normalize_wide_int(raw.eligibleether),
            voted_ether: normalize_wide_int(raw.votedether),
            finalized: raw.finalized,
        }
    }
}

/// Explorer `/api/v1/epoch/{n}/slots` entry.
#[derive(Debug, Deserialize)]
pub struct RawExplorerSlot {
    #[serde(deserialize_with = "quoted_u64")]
    pub slot: u64,
    #[serde(default)]
    pub bodyroot: Option<String>,
    #[serde(default)]
    pub blockroot: Option<String>,
    #[serde(deserialize_with = "quoted_u64")]
    pub proposer: u64,
    /// `"1"` proposed, `"2"` missed, `"3"` orphaned.
    pub status: String,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub exec_timestamp: Option<u64>,
}

impl TryFrom<RawExplorerSlot> for SlotHeader {
    type Error = String;

    fn try_from(raw: RawExplorerSlot) -> Result<Self, Self::Error> {
        let body_root = raw
            .bodyroot
            .or(raw.blockroot)
            .ok_or_else(|| format!("slot {} has no block root", raw.slot))?;
        Ok(SlotHeader::new(
            raw.slot,
            body_root,
            raw.proposer,
            raw.status == "1",
            raw.exec_timestamp,
        ))
    }
}

/// Node `/eth/v1/beacon/headers` entry.
#[derive(Debug, Deserialize)]
pub struct RawHeaderEntry {
    #[serde(default)]
    pub canonical: bool,
    pub header: RawSignedHeader,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawSignedHeader {
    pub message: RawHeaderMessage,
}

#[derive(Debug, Deserialize)]
pub struct RawHeaderMessage {
    #[serde(deserialize_with = "quoted_u64")]
    pub slot: u64,
    #[serde(deserialize_with = "quoted_u64")]
    pub proposer_index: u64,
    pub body_root: String,
}

impl From<RawHeaderEntry> for SlotHeader {
    fn from(raw: RawHeaderEntry) -> Self {
        let message = raw.header.message;
        SlotHeader::new(
            message.slot,
            message.body_root,
            message.proposer_index,
            raw.canonical,
            raw.timestamp,
        )
    }
}

/// Node `/eth/v1/beacon/states/head/epochs` entry.
#[derive(Debug, Deserialize)]
pub struct RawNodeEpoch {
    #[serde(deserialize_with = "quoted_u64")]
    pub epoch: u64,
    #[serde(default)]
    pub eligible_eth: Option<WideInt>,
    #[serde(default)]
    pub voted_eth: Option<WideInt>,
    #[serde(default)]
    pub finalized: bool,
    #[serde(deserialize_with = "quoted_u64")]
    pub time_since_last_epoch: u64,
}

impl RawNodeEpoch {
    /// Anchors the relative `time_since_last_epoch` at `fetched_at`.
    pub fn into_epoch(self, fetched_at: i64) -> Epoch {
        let fetched_at = u64::try_from(fetched_at).unwrap_or(0);
        Epoch {
            epoch: self.epoch,
            time: Some(fetched_at.saturating_sub(self.time_since_last_epoch)),
            eligible_ether: normalize_wide_int(self.eligible_eth),
            voted_ether: normalize_wide_int(self.voted_eth),
            finalized: self.finalized,
        }
    }
}

// ============================================================================
// Field helpers
// ============================================================================

struct QuotedU64Visitor;

impl Visitor<'_> for QuotedU64Visitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative value {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.parse()
            .map_err(|_| E::custom(format!("invalid unsigned integer {:?}", v)))
    }
}

/// Accepts `123` and `"123"`.
pub fn quoted_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(QuotedU64Visitor)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Seconds(u64),
    Text(String),
}

/// Accepts unix seconds (number or decimal string) or an RFC 3339 string.
pub fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    match Option::<TimestampRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(TimestampRepr::Seconds(secs)) => Ok(Some(secs)),
        Some(TimestampRepr::Text(text)) => {
            if let Ok(secs) = text.parse::<u64>() {
                return Ok(Some(secs));
            }
            let parsed = DateTime::parse_from_rfc3339(&text)
                .map_err(|e| de::Error::custom(format!("invalid timestamp {:?}: {}", text, e)))?;
            u64::try_from(parsed.timestamp())
                .map(Some)
                .map_err(|_| de::Error::custom(format!("timestamp {:?} predates 1970", text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explorer_epoch() {
        let raw: DataEnvelope<RawExplorerEpoch> = serde_json::from_value(json!({
            "status": "OK",
            "data": {
                "epoch": 312_000,
                "ts": "2024-10-23T10:40:23Z",
                "eligibleether": 34_101_221_000_000_000u64,
                "votedether": 33_812_004_000_000_000u64,
                "finalized": false
            }
        }))
        .unwrap();

        let epoch = Epoch::from(raw.data);
        assert_eq!(epoch.epoch, 312_000);
        assert_eq!(epoch.time, Some(1_729_680_023));
        assert_eq!(epoch.eligible_ether.as_deref(), Some("34101221000000000"));
        assert!(!epoch.finalized);
    }

    #[test]
    fn test_explorer_slot_status() {
        let raw: Vec<RawExplorerSlot> = serde_json::from_value(json!([
            { "slot": 9_984_000, "blockroot": "0xaa", "proposer": 1201, "status": "1" },
            { "slot": 9_984_001, "blockroot": "0xbb", "proposer": 77, "status": "2" }
        ]))
        .unwrap();

        let slots: Vec<SlotHeader> = raw
            .into_iter()
            .map(SlotHeader::try_from)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(slots[0].epoch, 312_000);
        assert!(slots[0].canonical);
        assert!(!slots[1].canonical);
        assert_eq!(slots[1].body_root, "0xbb");
    }

    #[test]
    fn test_explorer_slot_without_root_is_rejected() {
        let raw: RawExplorerSlot = serde_json::from_value(json!({
            "slot": 5, "proposer": 1, "status": "1"
        }))
        .unwrap();
        assert!(SlotHeader::try_from(raw).is_err());
    }

    #[test]
    fn test_node_header_quoted_integers() {
        let raw: RawHeaderEntry = serde_json::from_value(json!({
            "root": "0x01",
            "canonical": true,
            "header": {
                "message": {
                    "slot": "100",
                    "proposer_index": "42",
                    "parent_root": "0x02",
                    "state_root": "0x03",
                    "body_root": "0x04"
                },
                "signature": "0x05"
            }
        }))
        .unwrap();

        let header = SlotHeader::from(raw);
        assert_eq!(header.slot, 100);
        assert_eq!(header.epoch, 3);
        assert_eq!(header.proposer_index, 42);
        assert_eq!(header.timestamp, None);
    }

    #[test]
    fn test_node_header_bad_slot() {
        let result: Result<RawHeaderEntry, _> = serde_json::from_value(json!({
            "canonical": true,
            "header": { "message": { "slot": "abc", "proposer_index": "1", "body_root": "0x" } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_node_epoch_anchor() {
        let raw: RawNodeEpoch = serde_json::from_value(json!({
            "epoch": "312000",
            "eligible_eth": "34101221000000000",
            "voted_eth": "33812004000000000",
            "finalized": true,
            "time_since_last_epoch": 390
        }))
        .unwrap();

        let epoch = raw.into_epoch(1_700_000_000);
        assert_eq!(epoch.time, Some(1_699_999_610));
        assert!(epoch.finalized);
        assert_eq!(epoch.voted_ether.as_deref(), Some("33812004000000000"));
    }

    #[test]
    fn test_optional_timestamp_forms() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "optional_timestamp")]
            ts: Option<u64>,
        }

        let parse = |v| serde_json::from_value::<Holder>(v).map(|p| p.ts);
        assert_eq!(parse(json!({ "ts": 1_700_000_000 })).unwrap(), Some(1_700_000_000));
        assert_eq!(parse(json!({ "ts": "1700000000" })).unwrap(), Some(1_700_000_000));
        assert_eq!(parse(json!({ "ts": null })).unwrap(), None);
        assert_eq!(parse(json!({})).unwrap(), None);
        assert!(parse(json!({ "ts": "yesterday" })).is_err());
    }
}
