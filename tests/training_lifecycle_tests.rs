mod common;

use common::pool_with_nodes;
use compute_mesh_node::{
    EngineConfig, PoolError, PoolEvent, PoolMessage, TrainingConfig, TrainingStatus,
};
use libp2p::PeerId;

fn training_config(epochs: u32) -> TrainingConfig {
    TrainingConfig {
        epochs,
        ..Default::default()
    }
}

#[tokio::test]
async fn training_job_runs_to_completion() {
    let (engine, transport, _) = pool_with_nodes(3, EngineConfig::default()).await;

    let id = engine
        .submit_distributed_training("llama-7b", training_config(2), 2)
        .await
        .unwrap();

    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Initializing);
    assert_eq!(job.participants.len(), 2);
    let participants: Vec<PeerId> = job.participants.clone();

    // Every participant got an init message.
    for p in &participants {
        assert!(transport
            .sent_to(*p)
            .await
            .iter()
            .any(|m| matches!(m, PoolMessage::TrainingInit { .. })));
    }

    // Acks arrive asynchronously, in any order.
    for p in participants.iter().rev() {
        engine
            .handle_event(PoolEvent::MessageReceived {
                peer: *p,
                message: PoolMessage::TrainingInitAck { job_id: id },
            })
            .await;
    }
    assert_eq!(
        engine.get_training_job_status(id).await.unwrap().status,
        TrainingStatus::Training
    );

    // Epoch 1 reports from both participants.
    for (i, p) in participants.iter().enumerate() {
        engine
            .handle_event(PoolEvent::MessageReceived {
                peer: *p,
                message: PoolMessage::TrainingProgress {
                    job_id: id,
                    epoch: 1,
                    local_loss: 1.0 + i as f64,
                },
            })
            .await;
    }
    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.progress.current_epoch, 2);
    assert!((job.progress.global_loss - 1.5).abs() < 1e-12);

    // Final epoch triggers synchronization.
    for p in &participants {
        engine
            .handle_event(PoolEvent::MessageReceived {
                peer: *p,
                message: PoolMessage::TrainingProgress {
                    job_id: id,
                    epoch: 2,
                    local_loss: 0.5,
                },
            })
            .await;
    }
    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Synchronizing);
    for p in &participants {
        assert!(transport
            .sent_to(*p)
            .await
            .iter()
            .any(|m| matches!(m, PoolMessage::SyncRequest { .. })));
    }

    for p in &participants {
        engine
            .handle_event(PoolEvent::MessageReceived {
                peer: *p,
                message: PoolMessage::SyncAck { job_id: id },
            })
            .await;
    }
    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Completed);
    assert!((job.progress.global_loss - 0.5).abs() < 1e-12);

    // Load shares released on completion.
    for p in &participants {
        let node = engine.registry().get(*p).await.unwrap();
        assert!(node.current_load.abs() < 1e-9);
    }
}

#[tokio::test]
async fn submission_fails_without_enough_nodes() {
    let (engine, _, _) = pool_with_nodes(1, EngineConfig::default()).await;

    let err = engine
        .submit_distributed_training("llama-7b", training_config(1), 2)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PoolError::InsufficientCapacity {
            required: 2,
            available: 1
        }
    );
    assert_eq!(engine.get_pool_statistics().await.active_training_jobs, 0);
}

#[tokio::test]
async fn participant_loss_below_minimum_fails_on_next_event() {
    let (engine, _, _) = pool_with_nodes(2, EngineConfig::default()).await;

    let id = engine
        .submit_distributed_training("llama-7b", training_config(5), 2)
        .await
        .unwrap();
    let participants = engine.get_training_job_status(id).await.unwrap().participants;

    engine
        .handle_event(PoolEvent::PeerDisconnected {
            peer: participants[0],
        })
        .await;

    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Failed);
    assert_eq!(job.error, Some(PoolError::ParticipantLoss(id)));
    assert_eq!(job.participants.len(), 1);
}

#[tokio::test]
async fn participants_only_ever_shrink() {
    let (engine, _, _) = pool_with_nodes(4, EngineConfig::default()).await;

    let id = engine
        .submit_distributed_training("llama-7b", training_config(3), 3)
        .await
        .unwrap();
    let before = engine.get_training_job_status(id).await.unwrap().participants;
    assert_eq!(before.len(), 3);

    engine
        .handle_event(PoolEvent::PeerDisconnected { peer: before[1] })
        .await;
    let after = engine.get_training_job_status(id).await.unwrap().participants;
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|p| before.contains(p)));

    // The job keeps going with the remaining pair.
    assert!(!engine
        .get_training_job_status(id)
        .await
        .unwrap()
        .status
        .is_terminal());
}

#[tokio::test]
async fn cancellation_is_terminal_and_ignores_late_messages() {
    let (engine, _, _) = pool_with_nodes(2, EngineConfig::default()).await;

    let id = engine
        .submit_distributed_training("llama-7b", training_config(3), 2)
        .await
        .unwrap();
    let participants = engine.get_training_job_status(id).await.unwrap().participants;

    assert!(engine.cancel_training_job(id).await);
    assert!(!engine.cancel_training_job(id).await);
    let job = engine.get_training_job_status(id).await.unwrap();
    assert_eq!(job.status, TrainingStatus::Failed);
    assert!(job.error.is_none());

    // A report from before the cancellation arrives late; it must not
    // resurrect the job.
    engine
        .handle_event(PoolEvent::MessageReceived {
            peer: participants[0],
            message: PoolMessage::TrainingProgress {
                job_id: id,
                epoch: 1,
                local_loss: 0.1,
            },
        })
        .await;
    assert_eq!(
        engine.get_training_job_status(id).await.unwrap().status,
        TrainingStatus::Failed
    );
}

#[tokio::test]
async fn unknown_job_operations_are_harmless() {
    let (engine, _, peers) = pool_with_nodes(1, EngineConfig::default()).await;

    let bogus = uuid::Uuid::new_v4();
    assert!(engine.get_training_job_status(bogus).await.is_none());
    assert!(!engine.cancel_training_job(bogus).await);
    engine
        .handle_event(PoolEvent::MessageReceived {
            peer: peers[0],
            message: PoolMessage::TrainingInitAck { job_id: bogus },
        })
        .await;
}
