//! REST client for the consensus layer
//!
//! Two base URLs are involved: a beacon node serving the standard
//! `/eth/v1/...` routes (headers, head-state epochs) and a beacon explorer
//! serving `/api/v1/epoch/...` (latest epoch, slots of an epoch). Both
//! default to the same host.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::ConsensusSource;
use crate::consensus::{
    DataEnvelope, Epoch, RawExplorerEpoch, RawExplorerSlot, RawHeaderEntry, RawNodeEpoch,
    SlotHeader,
};
use crate::error::{ExplorerError, Result, Upstream};

const HEADERS_PATH: &str = "/eth/v1/beacon/headers";
const HEAD_EPOCHS_PATH: &str = "/eth/v1/beacon/states/head/epochs";
const CURRENT_SLOT_POINTER: &str = "/data/0/header/message/slot";

pub struct BeaconClient {
    http: reqwest::Client,
    node_url: String,
    explorer_url: String,
}

impl BeaconClient {
    pub fn new(
        node_url: impl Into<String>,
        explorer_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplorerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let node_url = node_url.into().trim_end_matches('/').to_string();
        let explorer_url = explorer_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| node_url.clone());

        Ok(Self {
            http,
            node_url,
            explorer_url,
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn explorer_url(&self) -> &str {
        &self.explorer_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(url = %url, "beacon.get");
        self.http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExplorerError::from_transport(Upstream::Consensus, e))?
            .json()
            .await
            .map_err(|e| ExplorerError::from_transport(Upstream::Consensus, e))
    }
}

#[async_trait]
impl ConsensusSource for BeaconClient {
    async fn latest_epoch(&self) -> Result<Epoch> {
        let url = format!("{}/api/v1/epoch/latest", self.explorer_url);
        let envelope: DataEnvelope<RawExplorerEpoch> = self.get_json(url).await?;
        Ok(Epoch::from(envelope.data))
    }

    async fn slots(&self, epoch: u64) -> Result<Vec<SlotHeader>> {
        let url = format!("{}/api/v1/epoch/{}/slots", self.explorer_url, epoch);
        let envelope: DataEnvelope<Vec<RawExplorerSlot>> = self.get_json(url).await?;
        envelope
            .data
            .into_iter()
            .map(|raw| {
                SlotHeader::try_from(raw)
                    .map_err(|e| ExplorerError::malformed(Upstream::Consensus, e))
            })
            .collect()
    }

    async fn recent_headers(&self, limit: usize) -> Result<Vec<SlotHeader>> {
        let url = format!("{}{}", self.node_url, HEADERS_PATH);
        let envelope: DataEnvelope<Vec<RawHeaderEntry>> = self.get_json(url).await?;
        Ok(envelope
            .data
            .into_iter()
            .take(limit)
            .map(SlotHeader::from)
            .collect())
    }

    async fn recent_epochs(&self, limit: usize, now: i64) -> Result<Vec<Epoch>> {
        let url = format!("{}{}", self.node_url, HEAD_EPOCHS_PATH);
        let envelope: DataEnvelope<Vec<RawNodeEpoch>> = self.get_json(url).await?;
        Ok(envelope
            .data
            .into_iter()
            .take(limit)
            .map(|raw| raw.into_epoch(now))
            .collect())
    }

    async fn current_slot(&self) -> Result<u64> {
        let url = format!("{}{}", self.node_url, HEADERS_PATH);
        let body: Value = self.get_json(url).await?;

        let slot = body.pointer(CURRENT_SLOT_POINTER).ok_or_else(|| {
            ExplorerError::malformed(
                Upstream::Consensus,
                format!("headers response has no {}", CURRENT_SLOT_POINTER),
            )
        })?;

        match slot {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
        .ok_or_else(|| {
            ExplorerError::malformed(Upstream::Consensus, format!("invalid slot value {}", slot))
        })
    }
}
