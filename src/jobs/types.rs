// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use libp2p::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::aggregation::AggregatedResult;
use crate::error::PoolError;

pub type JobId = Uuid;

/// How a training workload is split across participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionStrategy {
    DataParallel,
    ModelParallel,
    PipelineParallel,
}

/// How an inference computation is sharded across assigned nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShardingStrategy {
    LayerWise,
    TensorWise,
    Pipeline,
    Ensemble,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub batch_size: u32,
    pub learning_rate: f64,
    pub epochs: u32,
    pub optimizer: String,
    pub loss_function: String,
    pub strategy: DistributionStrategy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            learning_rate: 0.001,
            epochs: 10,
            optimizer: "adam".to_string(),
            loss_function: "cross-entropy".to_string(),
            strategy: DistributionStrategy::DataParallel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    Initializing,
    Training,
    Synchronizing,
    Completed,
    Failed,
}

impl TrainingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStatus::Completed | TrainingStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStatus {
    Pending,
    Processing,
    Aggregating,
    Completed,
    Failed,
}

impl InferenceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InferenceStatus::Completed | InferenceStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantProgress {
    pub epoch: u32,
    pub local_loss: f64,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TrainingProgress {
    pub current_epoch: u32,
    pub total_epochs: u32,
    pub global_loss: f64,
    pub accuracy: Option<f64>,
    pub participants: HashMap<PeerId, ParticipantProgress>,
}

impl TrainingProgress {
    pub fn new(total_epochs: u32) -> Self {
        Self {
            current_epoch: 1,
            total_epochs,
            global_loss: 0.0,
            accuracy: None,
            participants: HashMap::new(),
        }
    }
}

/// One partial result from one assigned node. A `None` payload means the node
/// reported but its output could not be parsed; aggregation skips it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeResult {
    pub peer: PeerId,
    pub payload: Option<Vec<f64>>,
    pub confidence: f64,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferencePerformance {
    pub total_latency_ms: u64,
    /// Inverse of latency, in results per second.
    pub throughput: f64,
    /// Penalizes node count: more participating nodes cost more even at
    /// equal latency, to discourage unnecessary fan-out.
    pub efficiency: f64,
}

impl InferencePerformance {
    pub fn measure(total_latency_ms: u64, node_count: usize) -> Self {
        let latency_secs = (total_latency_ms.max(1) as f64) / 1000.0;
        Self {
            total_latency_ms,
            throughput: 1.0 / latency_secs,
            efficiency: 1.0 / (latency_secs * node_count.max(1) as f64),
        }
    }
}

/// One submitted training run. Participants are referenced by identity; load
/// and status always resolve through the registry.
#[derive(Debug, Clone)]
pub struct DistributedTrainingJob {
    pub id: JobId,
    pub model_id: String,
    pub coordinator: PeerId,
    pub participants: Vec<PeerId>,
    pub config: TrainingConfig,
    pub status: TrainingStatus,
    pub progress: TrainingProgress,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Participants that have not yet acknowledged initialization.
    pub pending_init: HashSet<PeerId>,
    /// Participants that have not yet acknowledged synchronization.
    pub pending_sync: HashSet<PeerId>,
    /// Cooperative deadline for the waiting state, resolved by an incoming
    /// message or by the monitor's next tick.
    pub deadline: Option<DateTime<Utc>>,
    /// Why the job failed, when it did. Cancellation leaves this empty.
    pub error: Option<PoolError>,
}

impl DistributedTrainingJob {
    pub fn is_participant(&self, peer: &PeerId) -> bool {
        self.participants.contains(peer)
    }
}

/// One submitted inference request.
#[derive(Debug, Clone)]
pub struct ModelInferenceJob {
    pub id: JobId,
    pub model_id: String,
    pub input: serde_json::Value,
    pub required_nodes: usize,
    pub sharding: ShardingStrategy,
    pub assigned_nodes: Vec<PeerId>,
    pub status: InferenceStatus,
    /// Per-node results in arrival order; layer-wise aggregation depends on
    /// submission order.
    pub received: Vec<NodeResult>,
    pub results: Option<AggregatedResult>,
    pub performance: Option<InferencePerformance>,
    pub dispatched_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    /// Why the job failed, when it did. Cancellation leaves this empty.
    pub error: Option<PoolError>,
}

impl ModelInferenceJob {
    pub fn has_reported(&self, peer: &PeerId) -> bool {
        self.received.iter().any(|r| r.peer == *peer)
    }

    pub fn all_assigned_reported(&self) -> bool {
        !self.assigned_nodes.is_empty()
            && self.assigned_nodes.iter().all(|p| self.has_reported(p))
    }
}

/// Pool-wide statistics exposed to the rest of the system.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolStatistics {
    pub total_nodes: usize,
    pub available_nodes: usize,
    pub active_training_jobs: usize,
    pub active_inference_jobs: usize,
    pub total_compute_capacity: f64,
    pub average_load: f64,
}
