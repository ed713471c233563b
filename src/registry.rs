use chrono::{DateTime, Duration as ChronoDuration, Utc};
use libp2p::PeerId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::capability::{derive_specializations, CapabilityDescriptor, Specialization};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Available,
    Busy,
    Maintenance,
    Offline,
}

/// One entry per known peer. Owned by the registry; jobs reference nodes by
/// identity and resolve current load/status here, never through a stale copy.
#[derive(Debug, Clone)]
pub struct ComputeNode {
    pub peer_id: PeerId,
    pub capabilities: CapabilityDescriptor,
    pub current_load: f64,
    pub reputation: f64,
    pub specializations: HashSet<Specialization>,
    pub status: NodeStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

impl ComputeNode {
    pub fn has_specialization(&self, tag: Specialization) -> bool {
        self.specializations.contains(&tag)
    }
}

/// Reputation assigned to a peer on first registration.
pub const NEUTRAL_REPUTATION: f64 = 50.0;

/// Hook invoked before a node record is removed or goes stale, so in-flight
/// jobs can drop the peer first. The job manager implements this.
#[async_trait::async_trait]
pub trait NodeDepartureHook: Send + Sync {
    async fn node_departed(&self, peer: PeerId);
}

pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<PeerId, ComputeNode>>>,
    departure_hook: Arc<RwLock<Option<Arc<dyn NodeDepartureHook>>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            departure_hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Install the job-manager hook. Wired once at engine construction.
    pub async fn set_departure_hook(&self, hook: Arc<dyn NodeDepartureHook>) {
        *self.departure_hook.write().await = Some(hook);
    }

    /// Register a peer on connect. Re-registering the same peer overwrites its
    /// capabilities (they may legitimately change between reconnects) but
    /// retains accumulated load and reputation.
    pub async fn register_node(&self, peer: PeerId, caps: CapabilityDescriptor) -> ComputeNode {
        let specializations = derive_specializations(&caps);
        let now = Utc::now();
        let mut nodes = self.nodes.write().await;

        let node = match nodes.get(&peer) {
            Some(existing) => ComputeNode {
                peer_id: peer,
                capabilities: caps,
                current_load: existing.current_load,
                reputation: existing.reputation,
                specializations,
                status: NodeStatus::Available,
                last_heartbeat: now,
                registered_at: existing.registered_at,
            },
            None => ComputeNode {
                peer_id: peer,
                capabilities: caps,
                current_load: 0.0,
                reputation: NEUTRAL_REPUTATION,
                specializations,
                status: NodeStatus::Available,
                last_heartbeat: now,
                registered_at: now,
            },
        };

        info!(peer = %peer, specializations = node.specializations.len(), "registered compute node");
        nodes.insert(peer, node.clone());
        node
    }

    /// Remove a peer on an explicit disconnect. In-flight jobs are notified
    /// before the record disappears.
    pub async fn unregister_node(&self, peer: PeerId) -> bool {
        let hook = self.departure_hook.read().await.clone();
        if let Some(hook) = hook {
            hook.node_departed(peer).await;
        }

        let removed = self.nodes.write().await.remove(&peer).is_some();
        if removed {
            info!(peer = %peer, "unregistered compute node");
        }
        removed
    }

    /// Refresh a peer's last-seen timestamp. Does not change status.
    pub async fn heartbeat(&self, peer: PeerId) -> bool {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&peer) {
            Some(node) => {
                node.last_heartbeat = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, peer: PeerId) -> Option<ComputeNode> {
        self.nodes.read().await.get(&peer).cloned()
    }

    pub async fn list_available(&self) -> Vec<ComputeNode> {
        self.nodes
            .read()
            .await
            .values()
            .filter(|n| n.status == NodeStatus::Available)
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> Vec<ComputeNode> {
        self.nodes.read().await.values().cloned().collect()
    }

    pub async fn set_status(&self, peer: PeerId, status: NodeStatus) -> bool {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&peer) {
            Some(node) => {
                debug!(peer = %peer, ?status, "node status changed");
                node.status = status;
                true
            }
            None => false,
        }
    }

    /// Is the peer present and not offline?
    pub async fn is_live(&self, peer: PeerId) -> bool {
        self.nodes
            .read()
            .await
            .get(&peer)
            .map(|n| n.status != NodeStatus::Offline)
            .unwrap_or(false)
    }

    /// Adjust a node's load by `delta`, clamped to [0, 1].
    pub async fn adjust_load(&self, peer: PeerId, delta: f64) {
        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes.get_mut(&peer) {
            node.current_load = (node.current_load + delta).clamp(0.0, 1.0);
        }
    }

    /// Reputation is maintained externally; the registry just stores it.
    pub async fn set_reputation(&self, peer: PeerId, reputation: f64) -> bool {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&peer) {
            Some(node) => {
                node.reputation = reputation;
                true
            }
            None => false,
        }
    }

    /// Mark nodes whose heartbeat age exceeds `timeout` as offline and notify
    /// the job manager for each. Records are kept; deletion only happens on an
    /// explicit disconnect.
    pub async fn mark_offline_if_stale(&self, timeout: Duration) -> Vec<PeerId> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(timeout).unwrap_or_else(|_| ChronoDuration::seconds(60));

        let mut went_stale = Vec::new();
        {
            let mut nodes = self.nodes.write().await;
            for node in nodes.values_mut() {
                if node.status != NodeStatus::Offline && node.last_heartbeat < cutoff {
                    warn!(peer = %node.peer_id, "node heartbeat stale, marking offline");
                    node.status = NodeStatus::Offline;
                    went_stale.push(node.peer_id);
                }
            }
        }

        if !went_stale.is_empty() {
            let hook = self.departure_hook.read().await.clone();
            if let Some(hook) = hook {
                for peer in &went_stale {
                    hook.node_departed(*peer).await;
                }
            }
        }

        went_stale
    }

    pub async fn stats(&self) -> RegistryStats {
        let nodes = self.nodes.read().await;
        let available: Vec<_> = nodes
            .values()
            .filter(|n| n.status == NodeStatus::Available)
            .collect();

        let total_compute_capacity = nodes
            .values()
            .map(|n| n.capabilities.gpu_compute_units as f64 + n.capabilities.cpu_cores as f64)
            .sum();
        let average_load = if nodes.is_empty() {
            0.0
        } else {
            nodes.values().map(|n| n.current_load).sum::<f64>() / nodes.len() as f64
        };

        RegistryStats {
            total_nodes: nodes.len(),
            available_nodes: available.len(),
            total_compute_capacity,
            average_load,
        }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStats {
    pub total_nodes: usize,
    pub available_nodes: usize,
    pub total_compute_capacity: f64,
    pub average_load: f64,
}
