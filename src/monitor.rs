//! Periodic monitor/balancer loop.
//!
//! One scheduled task with bounded per-tick work: sweep stale nodes, detect
//! load imbalance, and flag stalled jobs. Detection only; recovery is the
//! caller's business. The three duties run unconditionally each tick so a
//! problem in one never starves the others.

use libp2p::PeerId;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::jobs::manager::JobManager;
use crate::jobs::types::JobId;
use crate::registry::{NodeRegistry, NodeStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Heartbeat age exceeded the timeout; the node was marked offline.
    NodeWentStale(PeerId),
    /// Node load deviates from the available-pool mean by more than the
    /// configured margin. Reported for an external balancer to act on.
    LoadImbalance {
        peer: PeerId,
        load: f64,
        mean_load: f64,
    },
    /// Training job with no update past the stall grace period.
    TrainingStalled(JobId),
    /// Inference job that exceeded its processing deadline.
    InferenceStalled(JobId),
}

#[derive(Clone)]
pub struct MonitorLoop {
    config: EngineConfig,
    registry: Arc<NodeRegistry>,
    manager: JobManager,
    subscribers: Arc<RwLock<Vec<mpsc::Sender<MonitorEvent>>>>,
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl MonitorLoop {
    pub fn new(config: EngineConfig, registry: Arc<NodeRegistry>, manager: JobManager) -> Self {
        Self {
            config,
            registry,
            manager,
            subscribers: Arc::new(RwLock::new(Vec::new())),
            shutdown_tx: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<MonitorEvent> {
        let (tx, rx) = mpsc::channel(100);
        self.subscribers.write().await.push(tx);
        rx
    }

    /// Run the loop on its own schedule until `stop` is called.
    pub async fn spawn(&self) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(monitor.config.monitor_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.tick().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("monitor loop shutting down");
                        break;
                    }
                }
            }
        });
    }

    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(()).await;
        }
    }

    /// One pass of all three duties. Exposed so tests can drive ticks
    /// deterministically without waiting on the interval.
    pub async fn tick(&self) {
        self.sweep_stale_nodes().await;
        self.detect_load_imbalance().await;
        self.flag_stalled_jobs().await;
    }

    async fn sweep_stale_nodes(&self) {
        let stale = self
            .registry
            .mark_offline_if_stale(self.config.heartbeat_timeout)
            .await;
        for peer in stale {
            self.emit(MonitorEvent::NodeWentStale(peer)).await;
        }
    }

    async fn detect_load_imbalance(&self) {
        let available: Vec<_> = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .filter(|n| n.status == NodeStatus::Available)
            .collect();
        if available.is_empty() {
            return;
        }

        let mean = available.iter().map(|n| n.current_load).sum::<f64>() / available.len() as f64;
        for node in available {
            if (node.current_load - mean).abs() > self.config.load_imbalance_margin {
                warn!(peer = %node.peer_id, load = node.current_load, mean, "load imbalance detected");
                self.emit(MonitorEvent::LoadImbalance {
                    peer: node.peer_id,
                    load: node.current_load,
                    mean_load: mean,
                })
                .await;
            }
        }
    }

    async fn flag_stalled_jobs(&self) {
        let actions = self.manager.resolve_deadlines().await;
        for id in actions
            .inference_failed
            .iter()
            .chain(actions.inference_forced.iter())
        {
            self.emit(MonitorEvent::InferenceStalled(*id)).await;
        }

        for id in self.manager.stalled_training_jobs().await {
            warn!(job = %id, "training job stalled, flagging for recovery");
            self.emit(MonitorEvent::TrainingStalled(id)).await;
        }
    }

    async fn emit(&self, event: MonitorEvent) {
        let subscribers = self.subscribers.read().await;
        for tx in subscribers.iter() {
            let _ = tx.try_send(event.clone());
        }
    }
}
