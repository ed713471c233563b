//! Node selection engine.
//!
//! Pure over a registry snapshot: given the same snapshot and job config the
//! ranking is identical on every call, with ties broken by peer id so tests
//! are reproducible.

use tracing::debug;

use crate::capability::Specialization;
use crate::jobs::types::TrainingConfig;
use crate::registry::{ComputeNode, NodeStatus};

/// Scoring weights. The relative shape matters (reward reputation and
/// capability, penalize load, bonus for matching specializations); the exact
/// coefficients are tunable.
#[derive(Debug, Clone)]
pub struct SelectionWeights {
    pub training_reputation: f64,
    pub training_gpu_memory: f64,
    pub training_compute_units: f64,
    pub training_bandwidth: f64,
    pub training_load_penalty: f64,
    pub training_specialization_bonus: f64,
    pub gpu_bonus_training: f64,

    pub inference_reputation: f64,
    pub inference_gpu_memory: f64,
    pub inference_compute_units: f64,
    pub inference_load_penalty: f64,
    pub inference_specialization_bonus: f64,
    pub gpu_bonus_inference: f64,
    pub memory_cache_bonus: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            training_reputation: 0.3,
            training_gpu_memory: 0.2,
            training_compute_units: 0.1,
            training_bandwidth: 0.2,
            training_load_penalty: 50.0,
            training_specialization_bonus: 20.0,
            gpu_bonus_training: 15.0,
            inference_reputation: 0.4,
            inference_gpu_memory: 0.3,
            inference_compute_units: 0.2,
            inference_load_penalty: 30.0,
            inference_specialization_bonus: 25.0,
            gpu_bonus_inference: 20.0,
            memory_cache_bonus: 10.0,
        }
    }
}

/// Total memory above this suggests the node is likely to keep models cached
/// (MB).
const MODEL_CACHE_MEMORY_MB: u64 = 8000;

pub struct NodeSelector {
    weights: SelectionWeights,
    training_load_ceiling: f64,
    inference_load_ceiling: f64,
}

impl NodeSelector {
    pub fn new(training_load_ceiling: f64, inference_load_ceiling: f64) -> Self {
        Self {
            weights: SelectionWeights::default(),
            training_load_ceiling,
            inference_load_ceiling,
        }
    }

    pub fn with_weights(mut self, weights: SelectionWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn training_score(&self, node: &ComputeNode) -> f64 {
        let w = &self.weights;
        let mut score = w.training_reputation * node.reputation
            + w.training_gpu_memory * (node.capabilities.gpu_memory_mb as f64 / 1000.0)
            + w.training_compute_units * node.capabilities.gpu_compute_units as f64
            + w.training_bandwidth * (node.capabilities.bandwidth_mbps as f64 / 100.0)
            - w.training_load_penalty * node.current_load;

        if node.has_specialization(Specialization::DistributedTraining) {
            score += w.training_specialization_bonus;
        }
        if node.has_specialization(Specialization::GpuAcceleration) {
            score += w.gpu_bonus_training;
        }
        score
    }

    pub fn inference_score(&self, node: &ComputeNode) -> f64 {
        let w = &self.weights;
        let mut score = w.inference_reputation * node.reputation
            + w.inference_gpu_memory * (node.capabilities.gpu_memory_mb as f64 / 1000.0)
            + w.inference_compute_units * node.capabilities.gpu_compute_units as f64
            - w.inference_load_penalty * node.current_load;

        if node.has_specialization(Specialization::ModelInference) {
            score += w.inference_specialization_bonus;
        }
        if node.has_specialization(Specialization::GpuAcceleration) {
            score += w.gpu_bonus_inference;
        }
        if node.capabilities.total_memory_mb > MODEL_CACHE_MEMORY_MB {
            score += w.memory_cache_bonus;
        }
        score
    }

    /// Rank available nodes for a training job and take the top `n`. A short
    /// result is a capacity shortfall, not an error; the caller decides
    /// whether the job can proceed.
    pub fn select_for_training(
        &self,
        snapshot: &[ComputeNode],
        n: usize,
        config: &TrainingConfig,
    ) -> Vec<ComputeNode> {
        debug!(required = n, strategy = ?config.strategy, "selecting training participants");
        self.rank(snapshot, n, self.training_load_ceiling, |node| {
            self.training_score(node)
        })
    }

    /// Rank available nodes for an inference job and take the top `n`.
    pub fn select_for_inference(
        &self,
        snapshot: &[ComputeNode],
        n: usize,
        model_id: &str,
    ) -> Vec<ComputeNode> {
        debug!(required = n, model = model_id, "selecting inference nodes");
        self.rank(snapshot, n, self.inference_load_ceiling, |node| {
            self.inference_score(node)
        })
    }

    fn rank<F>(
        &self,
        snapshot: &[ComputeNode],
        n: usize,
        load_ceiling: f64,
        score: F,
    ) -> Vec<ComputeNode>
    where
        F: Fn(&ComputeNode) -> f64,
    {
        let mut scored: Vec<(f64, &ComputeNode)> = snapshot
            .iter()
            .filter(|node| node.status == NodeStatus::Available)
            .filter(|node| node.current_load < load_ceiling)
            .map(|node| (score(node), node))
            .collect();

        // Highest score first; ties broken by peer id for determinism.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.peer_id.to_string().cmp(&b.1.peer_id.to_string()))
        });

        scored.into_iter().take(n).map(|(_, node)| node.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{derive_specializations, CapabilityDescriptor};
    use crate::registry::NEUTRAL_REPUTATION;
    use chrono::Utc;
    use libp2p::identity::Keypair;
    use libp2p::PeerId;

    fn node(gpu_memory_mb: u64, load: f64) -> ComputeNode {
        let caps = CapabilityDescriptor {
            gpu_present: gpu_memory_mb > 0,
            gpu_memory_mb,
            gpu_compute_units: 32,
            supports_training: true,
            ..Default::default()
        };
        ComputeNode {
            peer_id: Keypair::generate_ed25519().public().to_peer_id(),
            specializations: derive_specializations(&caps),
            capabilities: caps,
            current_load: load,
            reputation: NEUTRAL_REPUTATION,
            status: NodeStatus::Available,
            last_heartbeat: Utc::now(),
            registered_at: Utc::now(),
        }
    }

    fn selector() -> NodeSelector {
        NodeSelector::new(0.7, 0.8)
    }

    #[test]
    fn training_selection_prefers_gpu_memory() {
        let snapshot = vec![node(16000, 0.0), node(8000, 0.0), node(2000, 0.0)];
        let picked = selector().select_for_training(&snapshot, 2, &TrainingConfig::default());

        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].capabilities.gpu_memory_mb, 16000);
        assert_eq!(picked[1].capabilities.gpu_memory_mb, 8000);
    }

    #[test]
    fn loaded_nodes_are_filtered_out() {
        let snapshot = vec![node(16000, 0.9), node(2000, 0.1)];
        let picked = selector().select_for_training(&snapshot, 2, &TrainingConfig::default());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].capabilities.gpu_memory_mb, 2000);

        // Inference tolerates more load than training.
        let snapshot = vec![node(16000, 0.75)];
        assert!(selector()
            .select_for_training(&snapshot, 1, &TrainingConfig::default())
            .is_empty());
        assert_eq!(selector().select_for_inference(&snapshot, 1, "m").len(), 1);
    }

    #[test]
    fn offline_nodes_are_never_selected() {
        let mut offline = node(16000, 0.0);
        offline.status = NodeStatus::Offline;
        let snapshot = vec![offline, node(2000, 0.0)];

        let picked = selector().select_for_inference(&snapshot, 2, "m");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].capabilities.gpu_memory_mb, 2000);
    }

    #[test]
    fn selection_is_deterministic() {
        let snapshot: Vec<ComputeNode> = (0..6).map(|_| node(8000, 0.2)).collect();
        let s = selector();

        let a: Vec<PeerId> = s
            .select_for_inference(&snapshot, 4, "m")
            .into_iter()
            .map(|n| n.peer_id)
            .collect();
        let b: Vec<PeerId> = s
            .select_for_inference(&snapshot, 4, "m")
            .into_iter()
            .map(|n| n.peer_id)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn short_result_when_fewer_qualify() {
        let snapshot = vec![node(16000, 0.0)];
        let picked = selector().select_for_training(&snapshot, 5, &TrainingConfig::default());
        assert_eq!(picked.len(), 1);
    }
}
