// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pool engine facade.
//!
//! Wires the registry, job manager and monitor together and exposes the
//! surface the rest of the system consumes. All network traffic flows through
//! the external [`Transport`]: the engine reacts to its events and never
//! blocks on delivery.

use anyhow::Result;
use libp2p::PeerId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::capability::CapabilityProbe;
use crate::config::EngineConfig;
use crate::error::PoolError;
use crate::jobs::manager::JobManager;
use crate::jobs::types::{
    DistributedTrainingJob, JobId, ModelInferenceJob, PoolStatistics, ShardingStrategy,
    TrainingConfig,
};
use crate::monitor::MonitorLoop;
use crate::registry::NodeRegistry;
use crate::transport::{PoolEvent, Transport};

pub struct ComputeMeshEngine {
    local_peer: PeerId,
    registry: Arc<NodeRegistry>,
    manager: JobManager,
    monitor: MonitorLoop,
}

impl ComputeMeshEngine {
    pub async fn new(
        config: EngineConfig,
        local_peer: PeerId,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let manager = JobManager::new(config.clone(), local_peer, registry.clone(), transport);
        registry.set_departure_hook(Arc::new(manager.clone())).await;
        let monitor = MonitorLoop::new(config, registry.clone(), manager.clone());

        Self {
            local_peer,
            registry,
            manager,
            monitor,
        }
    }

    /// Probe local hardware once and register ourselves as a pool member.
    pub async fn self_register(&self, probe: &dyn CapabilityProbe) -> Result<()> {
        let caps = probe.detect_local_capabilities().await?;
        info!(peer = %self.local_peer, "self-registering local node");
        self.registry.register_node(self.local_peer, caps).await;
        Ok(())
    }

    /// Start the monitor loop on its own schedule.
    pub async fn start(&self) {
        self.monitor.spawn().await;
    }

    pub async fn shutdown(&self) {
        self.monitor.stop().await;
    }

    /// Route one transport event. Any message from a peer refreshes its
    /// heartbeat before lifecycle handling.
    pub async fn handle_event(&self, event: PoolEvent) {
        match event {
            PoolEvent::PeerConnected { peer, capabilities } => {
                self.registry.register_node(peer, capabilities).await;
            }
            PoolEvent::PeerDisconnected { peer } => {
                debug!(peer = %peer, "peer disconnected");
                self.registry.unregister_node(peer).await;
            }
            PoolEvent::MessageReceived { peer, message } => {
                self.registry.heartbeat(peer).await;
                self.manager.handle_message(peer, message).await;
            }
        }
    }

    // -------------------------------------------------------- exposed surface

    pub async fn submit_distributed_training(
        &self,
        model_id: &str,
        config: TrainingConfig,
        required_nodes: usize,
    ) -> Result<JobId, PoolError> {
        self.manager
            .submit_training(model_id, config, required_nodes)
            .await
    }

    pub async fn submit_model_inference(
        &self,
        model_id: &str,
        input: serde_json::Value,
        sharding: ShardingStrategy,
        required_nodes: usize,
        allow_partial: bool,
    ) -> Result<JobId, PoolError> {
        self.manager
            .submit_inference(model_id, input, sharding, required_nodes, allow_partial)
            .await
    }

    pub async fn get_training_job_status(&self, id: JobId) -> Option<DistributedTrainingJob> {
        self.manager.training_status(id).await
    }

    pub async fn get_inference_job_status(&self, id: JobId) -> Option<ModelInferenceJob> {
        self.manager.inference_status(id).await
    }

    pub async fn cancel_training_job(&self, id: JobId) -> bool {
        self.manager.cancel_training(id).await
    }

    pub async fn cancel_inference_job(&self, id: JobId) -> bool {
        self.manager.cancel_inference(id).await
    }

    pub async fn get_pool_statistics(&self) -> PoolStatistics {
        let stats = self.registry.stats().await;
        PoolStatistics {
            total_nodes: stats.total_nodes,
            available_nodes: stats.available_nodes,
            active_training_jobs: self.manager.active_training_jobs().await,
            active_inference_jobs: self.manager.active_inference_jobs().await,
            total_compute_capacity: stats.total_compute_capacity,
            average_load: stats.average_load,
        }
    }

    /// Drop terminal jobs older than `max_age`; returns how many were purged.
    pub async fn purge_terminal_jobs(&self, max_age: tokio::time::Duration) -> usize {
        self.manager.purge_terminal_jobs(max_age).await
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn monitor(&self) -> &MonitorLoop {
        &self.monitor
    }
}
