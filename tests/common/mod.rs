use std::sync::Arc;

use compute_mesh_node::{
    CapabilityDescriptor, ComputeMeshEngine, EngineConfig, MockTransport, PoolEvent,
};
use libp2p::identity::Keypair;
use libp2p::PeerId;

pub fn peer() -> PeerId {
    Keypair::generate_ed25519().public().to_peer_id()
}

pub fn gpu_caps(gpu_memory_mb: u64) -> CapabilityDescriptor {
    CapabilityDescriptor {
        gpu_present: gpu_memory_mb > 0,
        gpu_memory_mb,
        gpu_compute_units: 64,
        cpu_cores: 16,
        total_memory_mb: 32000,
        bandwidth_mbps: 1000,
        supports_inference: true,
        supports_training: true,
        supports_sharding: true,
        ..Default::default()
    }
}

/// Engine with `n` identical GPU peers connected through a recording
/// transport.
pub async fn pool_with_nodes(
    n: usize,
    config: EngineConfig,
) -> (ComputeMeshEngine, Arc<MockTransport>, Vec<PeerId>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let transport = Arc::new(MockTransport::new());
    let engine = ComputeMeshEngine::new(config, peer(), transport.clone()).await;

    let mut peers = Vec::new();
    for _ in 0..n {
        let p = peer();
        engine
            .handle_event(PoolEvent::PeerConnected {
                peer: p,
                capabilities: gpu_caps(16000),
            })
            .await;
        peers.push(p);
    }
    (engine, transport, peers)
}
