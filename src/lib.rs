// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod aggregation;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod monitor;
pub mod registry;
pub mod selection;
pub mod transport;

// Re-export main types
pub use aggregation::{aggregate, AggregatedResult};
pub use capability::{
    derive_specializations, CapabilityDescriptor, CapabilityProbe, FixedProbe, Specialization,
};
pub use config::EngineConfig;
pub use engine::ComputeMeshEngine;
pub use error::PoolError;
pub use jobs::{
    DistributedTrainingJob, DistributionStrategy, InferencePerformance, InferenceStatus, JobId,
    JobManager, ModelInferenceJob, NodeResult, PoolStatistics, ShardingStrategy, TrainingConfig,
    TrainingStatus,
};
pub use monitor::{MonitorEvent, MonitorLoop};
pub use registry::{ComputeNode, NodeRegistry, NodeStatus, RegistryStats};
pub use selection::{NodeSelector, SelectionWeights};
pub use transport::{MockTransport, PoolEvent, PoolMessage, Transport};
