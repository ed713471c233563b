mod common;

use common::{gpu_caps, pool_with_nodes};
use compute_mesh_node::{
    EngineConfig, FixedProbe, InferenceStatus, MonitorEvent, PoolError, PoolEvent, PoolMessage,
    ShardingStrategy, TrainingConfig, TrainingStatus,
};
use serde_json::json;
use tokio::time::Duration;

#[tokio::test]
async fn stale_participant_fails_training_within_one_tick() {
    let config = EngineConfig {
        heartbeat_timeout: Duration::from_secs(0),
        ..Default::default()
    };
    let (engine, _, _) = pool_with_nodes(2, config).await;

    let id = engine
        .submit_distributed_training("m", TrainingConfig::default(), 2)
        .await
        .unwrap();

    let mut events = engine.monitor().subscribe().await;
    engine.monitor().tick().await;

    // Every silent node went offline, and the job failed on the same tick.
    assert!(matches!(
        events.try_recv().unwrap(),
        MonitorEvent::NodeWentStale(_)
    ));
    assert_eq!(
        engine.get_training_job_status(id).await.unwrap().status,
        TrainingStatus::Failed
    );
}

#[tokio::test]
async fn init_timeout_drops_unresponsive_participants() {
    let config = EngineConfig {
        init_timeout: Duration::from_secs(0),
        ..Default::default()
    };
    let (engine, _, _) = pool_with_nodes(3, config).await;

    let id = engine
        .submit_distributed_training("m", TrainingConfig::default(), 3)
        .await
        .unwrap();
    let participants = engine.get_training_job_status(id).await.unwrap().participants;

    // Two of three acknowledge; the third stays silent past the deadline.
    for p in &participants[..2] {
        engine
            .handle_event(PoolEvent::MessageReceived {
                peer: *p,
                message: PoolMessage::TrainingInitAck { job_id: id },
            })
            .await;
    }
    engine.monitor().tick().await;

    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Training);
    assert_eq!(job.participants.len(), 2);
    assert!(!job.participants.contains(&participants[2]));
}

#[tokio::test]
async fn epoch_timeout_promotes_partial_data() {
    let config = EngineConfig {
        epoch_timeout: Duration::from_secs(0),
        ..Default::default()
    };
    let (engine, _, _) = pool_with_nodes(2, config).await;

    let id = engine
        .submit_distributed_training("m", TrainingConfig { epochs: 3, ..Default::default() }, 2)
        .await
        .unwrap();
    let participants = engine.get_training_job_status(id).await.unwrap().participants;
    for p in &participants {
        engine
            .handle_event(PoolEvent::MessageReceived {
                peer: *p,
                message: PoolMessage::TrainingInitAck { job_id: id },
            })
            .await;
    }

    // Only one of the two reports the epoch; the slow peer must not block
    // the job indefinitely.
    engine
        .handle_event(PoolEvent::MessageReceived {
            peer: participants[0],
            message: PoolMessage::TrainingProgress {
                job_id: id,
                epoch: 1,
                local_loss: 2.0,
            },
        })
        .await;
    engine.monitor().tick().await;

    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Training);
    assert_eq!(job.progress.current_epoch, 2);
    assert!((job.progress.global_loss - 2.0).abs() < 1e-12);
}

#[tokio::test]
async fn processing_timeout_aggregates_partial_results() {
    let config = EngineConfig {
        processing_timeout: Duration::from_secs(0),
        ..Default::default()
    };
    let (engine, _, _) = pool_with_nodes(3, config).await;

    let id = engine
        .submit_model_inference("m", json!(null), ShardingStrategy::Ensemble, 3, false)
        .await
        .unwrap();
    let assigned = engine.get_inference_job_status(id).await.unwrap().assigned_nodes;

    engine
        .handle_event(PoolEvent::MessageReceived {
            peer: assigned[0],
            message: PoolMessage::InferenceResult {
                job_id: id,
                output: json!([4.0, 6.0]),
                confidence: 0.7,
                latency_ms: 25,
            },
        })
        .await;

    let mut events = engine.monitor().subscribe().await;
    engine.monitor().tick().await;

    let job = engine.get_inference_job_status(id).await.unwrap();
    assert_eq!(job.status, InferenceStatus::Completed);
    assert_eq!(job.results.unwrap().payload, vec![4.0, 6.0]);

    let mut saw_stall = false;
    while let Ok(event) = events.try_recv() {
        if event == MonitorEvent::InferenceStalled(id) {
            saw_stall = true;
        }
    }
    assert!(saw_stall);
}

#[tokio::test]
async fn processing_timeout_with_no_results_fails() {
    let config = EngineConfig {
        processing_timeout: Duration::from_secs(0),
        ..Default::default()
    };
    let (engine, _, _) = pool_with_nodes(2, config).await;

    let id = engine
        .submit_model_inference("m", json!(null), ShardingStrategy::Ensemble, 2, false)
        .await
        .unwrap();
    engine.monitor().tick().await;

    let job = engine.get_inference_job_status(id).await.unwrap();
    assert_eq!(job.status, InferenceStatus::Failed);
    assert_eq!(job.error, Some(PoolError::StallTimeout(id)));
}

#[tokio::test]
async fn load_imbalance_is_flagged_not_fixed() {
    let (engine, _, peers) = pool_with_nodes(2, EngineConfig::default()).await;
    engine.registry().adjust_load(peers[0], 0.9).await;

    let mut events = engine.monitor().subscribe().await;
    engine.monitor().tick().await;

    let mut flagged = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let MonitorEvent::LoadImbalance { peer, .. } = event {
            flagged.push(peer);
        }
    }
    // Both ends of the imbalance deviate from the mean by more than the
    // margin; the loaded node keeps its load untouched.
    assert!(flagged.contains(&peers[0]));
    assert!(
        (engine.registry().get(peers[0]).await.unwrap().current_load - 0.9).abs() < 1e-9
    );
}

#[tokio::test]
async fn pool_statistics_reflect_registry_and_jobs() {
    let (engine, _, _) = pool_with_nodes(3, EngineConfig::default()).await;
    engine
        .self_register(&FixedProbe(gpu_caps(8000)))
        .await
        .unwrap();

    engine
        .submit_distributed_training("m", TrainingConfig::default(), 2)
        .await
        .unwrap();
    engine
        .submit_model_inference("m", json!(null), ShardingStrategy::Ensemble, 1, false)
        .await
        .unwrap();

    let stats = engine.get_pool_statistics().await;
    assert_eq!(stats.total_nodes, 4);
    assert_eq!(stats.available_nodes, 4);
    assert_eq!(stats.active_training_jobs, 1);
    assert_eq!(stats.active_inference_jobs, 1);
    assert!(stats.total_compute_capacity > 0.0);
    assert!(stats.average_load > 0.0);
}

#[tokio::test]
async fn terminal_jobs_are_purged_after_retention() {
    let (engine, _, _) = pool_with_nodes(2, EngineConfig::default()).await;

    let id = engine
        .submit_distributed_training("m", TrainingConfig::default(), 2)
        .await
        .unwrap();
    engine.cancel_training_job(id).await;

    // Still within retention.
    let retention = EngineConfig::default().terminal_retention;
    assert_eq!(engine.purge_terminal_jobs(retention).await, 0);
    assert!(engine.get_training_job_status(id).await.is_some());

    assert_eq!(engine.purge_terminal_jobs(Duration::from_secs(0)).await, 1);
    assert!(engine.get_training_job_status(id).await.is_none());
}
