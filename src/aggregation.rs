// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Combines per-node partial results of a completed inference job into one
//! logical result, according to the job's declared sharding strategy.
//!
//! Malformed or absent payloads are excluded from the arithmetic with a
//! matching reduction in the divisor; aggregation only errors when no usable
//! result exists at all.

use tracing::debug;

use crate::error::PoolError;
use crate::jobs::types::{NodeResult, ShardingStrategy};

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub payload: Vec<f64>,
    pub confidence: f64,
}

/// Aggregate `results` (in submission order) under `strategy`.
pub fn aggregate(
    results: &[NodeResult],
    strategy: ShardingStrategy,
) -> Result<AggregatedResult, PoolError> {
    let valid: Vec<&NodeResult> = results.iter().filter(|r| r.payload.is_some()).collect();
    if valid.is_empty() {
        return Err(PoolError::MalformedResult);
    }
    debug!(
        total = results.len(),
        usable = valid.len(),
        ?strategy,
        "aggregating inference results"
    );

    let combined = match strategy {
        // Later pipeline stages depend on earlier ones, so only the terminal
        // stage's payload is semantically complete.
        ShardingStrategy::LayerWise => AggregatedResult {
            payload: last_payload(&valid),
            confidence: mean_confidence(&valid),
        },
        ShardingStrategy::Pipeline => AggregatedResult {
            payload: last_payload(&valid),
            confidence: valid.last().map(|r| r.confidence).unwrap_or(0.0),
        },
        ShardingStrategy::TensorWise | ShardingStrategy::Ensemble => AggregatedResult {
            payload: element_wise_mean(&valid),
            confidence: mean_confidence(&valid),
        },
    };

    Ok(combined)
}

fn last_payload(valid: &[&NodeResult]) -> Vec<f64> {
    valid
        .last()
        .and_then(|r| r.payload.clone())
        .unwrap_or_default()
}

fn mean_confidence(valid: &[&NodeResult]) -> f64 {
    valid.iter().map(|r| r.confidence).sum::<f64>() / valid.len() as f64
}

/// Element-wise mean over payloads of possibly differing lengths: each index
/// is divided by the number of vectors that actually contributed to it.
fn element_wise_mean(valid: &[&NodeResult]) -> Vec<f64> {
    let max_len = valid
        .iter()
        .filter_map(|r| r.payload.as_ref())
        .map(|p| p.len())
        .max()
        .unwrap_or(0);

    let mut sums = vec![0.0; max_len];
    let mut counts = vec![0usize; max_len];
    for result in valid {
        if let Some(payload) = &result.payload {
            for (i, value) in payload.iter().enumerate() {
                sums[i] += value;
                counts[i] += 1;
            }
        }
    }

    sums.iter()
        .zip(counts.iter())
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
        .collect()
}
