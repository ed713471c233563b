// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hardware/software capability descriptors and the specialization tags
//! derived from them.
//!
//! A descriptor is an immutable snapshot produced by an external probe. The
//! derivation into specialization tags is total and deterministic: the same
//! descriptor always yields the same tag set, with no side effects, so
//! re-registration is idempotent.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// GPU memory above this counts as large-model capable (MB).
pub const LARGE_GPU_MEMORY_MB: u64 = 8000;
/// Core count above this earns the parallel-processing tag.
pub const PARALLEL_CPU_CORES: u32 = 8;
/// Bandwidth above this earns the high-bandwidth tag (Mbps).
pub const HIGH_BANDWIDTH_MBPS: u64 = 500;

/// Snapshot of what a node can do, as reported by its local probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub gpu_present: bool,
    pub gpu_memory_mb: u64,
    pub gpu_compute_units: u32,
    pub supports_webgpu: bool,
    pub supports_neural_accel: bool,
    pub cpu_cores: u32,
    pub total_memory_mb: u64,
    pub bandwidth_mbps: u64,
    pub supports_inference: bool,
    pub supports_training: bool,
    pub supports_sharding: bool,
}

impl Default for CapabilityDescriptor {
    fn default() -> Self {
        Self {
            gpu_present: false,
            gpu_memory_mb: 0,
            gpu_compute_units: 0,
            supports_webgpu: false,
            supports_neural_accel: false,
            cpu_cores: 4,
            total_memory_mb: 8000,
            bandwidth_mbps: 100,
            supports_inference: true,
            supports_training: false,
            supports_sharding: false,
        }
    }
}

/// Tags derived from a capability descriptor, used to bias selection scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Specialization {
    GpuAcceleration,
    LargeModelInference,
    ModelTraining,
    WebgpuCompute,
    NeuralNetworkOptimization,
    ModelInference,
    DistributedTraining,
    ModelSharding,
    ParallelProcessing,
    HighBandwidthTasks,
}

/// Derive the specialization set for a descriptor.
pub fn derive_specializations(caps: &CapabilityDescriptor) -> HashSet<Specialization> {
    let mut tags = HashSet::new();

    if caps.gpu_present {
        tags.insert(Specialization::GpuAcceleration);
        if caps.gpu_memory_mb > LARGE_GPU_MEMORY_MB {
            tags.insert(Specialization::LargeModelInference);
            tags.insert(Specialization::ModelTraining);
        }
    }
    if caps.supports_webgpu {
        tags.insert(Specialization::WebgpuCompute);
    }
    if caps.supports_neural_accel {
        tags.insert(Specialization::NeuralNetworkOptimization);
    }
    if caps.supports_inference {
        tags.insert(Specialization::ModelInference);
    }
    if caps.supports_training {
        tags.insert(Specialization::DistributedTraining);
    }
    if caps.supports_sharding {
        tags.insert(Specialization::ModelSharding);
    }
    if caps.cpu_cores > PARALLEL_CPU_CORES {
        tags.insert(Specialization::ParallelProcessing);
    }
    if caps.bandwidth_mbps > HIGH_BANDWIDTH_MBPS {
        tags.insert(Specialization::HighBandwidthTasks);
    }

    tags
}

/// Probe seam for local hardware detection, invoked once at startup to
/// self-register. Production wires a real prober; tests use [`FixedProbe`].
#[async_trait::async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn detect_local_capabilities(&self) -> Result<CapabilityDescriptor>;
}

/// Probe returning a fixed descriptor.
pub struct FixedProbe(pub CapabilityDescriptor);

#[async_trait::async_trait]
impl CapabilityProbe for FixedProbe {
    async fn detect_local_capabilities(&self) -> Result<CapabilityDescriptor> {
        Ok(self.0.clone())
    }
}
