// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod manager;
pub mod types;

pub use manager::JobManager;
pub use types::{
    DistributedTrainingJob, DistributionStrategy, InferencePerformance, InferenceStatus, JobId,
    ModelInferenceJob, NodeResult, ParticipantProgress, PoolStatistics, ShardingStrategy,
    TrainingConfig, TrainingProgress, TrainingStatus,
};
