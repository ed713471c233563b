// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the compute pool core.
//!
//! Nothing in this crate panics across the public API boundary: every
//! operation returns a status or a `PoolError` so callers can always inspect
//! the outcome.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// Selection returned fewer nodes than the job requires. Surfaced at
    /// submission time; the job is never created.
    #[error("insufficient capacity: required {required} nodes, {available} qualified")]
    InsufficientCapacity { required: usize, available: usize },

    /// A job's live participant count fell below its minimum mid-flight.
    #[error("job {0} lost too many participants to continue")]
    ParticipantLoss(Uuid),

    /// A job exceeded its deadline without resolving.
    #[error("job {0} stalled past its deadline")]
    StallTimeout(Uuid),

    /// No received result could be incorporated into the aggregate.
    #[error("no usable result payloads to aggregate")]
    MalformedResult,

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("transport error: {0}")]
    Transport(String),
}
