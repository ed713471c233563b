//! Transport seam and wire envelopes.
//!
//! The core never blocks on network I/O: dispatch hands a message to the
//! transport and returns, and results arrive later as [`PoolEvent`]s whenever
//! the transport delivers them. Tests exercise out-of-order and delayed
//! delivery by feeding events directly.

use anyhow::Result;
use libp2p::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::capability::CapabilityDescriptor;
use crate::jobs::types::{JobId, ShardingStrategy, TrainingConfig};

/// Request/result envelopes carried between pool peers. Numeric contents are
/// opaque to this core beyond treating result vectors as arrays of numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PoolMessage {
    TrainingInit {
        job_id: JobId,
        model_id: String,
        config: TrainingConfig,
    },
    TrainingInitAck {
        job_id: JobId,
    },
    TrainingProgress {
        job_id: JobId,
        epoch: u32,
        local_loss: f64,
    },
    SyncRequest {
        job_id: JobId,
    },
    SyncAck {
        job_id: JobId,
    },
    InferenceDispatch {
        job_id: JobId,
        model_id: String,
        input: serde_json::Value,
        sharding: ShardingStrategy,
        shard_index: usize,
        shard_count: usize,
    },
    InferenceResult {
        job_id: JobId,
        output: serde_json::Value,
        confidence: f64,
        latency_ms: u64,
    },
    Heartbeat,
}

/// Events emitted by the transport layer and consumed by the engine.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    PeerConnected {
        peer: PeerId,
        capabilities: CapabilityDescriptor,
    },
    PeerDisconnected {
        peer: PeerId,
    },
    MessageReceived {
        peer: PeerId,
        message: PoolMessage,
    },
}

/// Outbound message delivery, implemented by the real network layer.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send_to_peer(&self, peer: PeerId, message: PoolMessage) -> Result<()>;
}

/// In-memory transport for tests: records every send and can be told to fail
/// delivery to specific peers.
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<RwLock<Vec<(PeerId, PoolMessage)>>>,
    unreachable: Arc<RwLock<HashSet<PeerId>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(PeerId, PoolMessage)> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, peer: PeerId) -> Vec<PoolMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|(p, _)| *p == peer)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub async fn set_unreachable(&self, peer: PeerId) {
        self.unreachable.write().await.insert(peer);
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send_to_peer(&self, peer: PeerId, message: PoolMessage) -> Result<()> {
        if self.unreachable.read().await.contains(&peer) {
            anyhow::bail!("peer {peer} unreachable");
        }
        self.sent.write().await.push((peer, message));
        Ok(())
    }
}
