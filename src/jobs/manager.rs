// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job lifecycle manager.
//!
//! Owns every training and inference job for its whole lifetime. Jobs live
//! behind per-job locks inside an outer map, so updates to one job are applied
//! in arrival order while unrelated jobs progress independently. All waiting
//! states carry a cooperative deadline that is resolved either by an incoming
//! message or by the monitor loop's next tick.

use chrono::{Duration as ChronoDuration, Utc};
use libp2p::PeerId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregation;
use crate::config::EngineConfig;
use crate::error::PoolError;
use crate::jobs::types::{
    DistributedTrainingJob, InferencePerformance, InferenceStatus, JobId, ModelInferenceJob,
    NodeResult, ParticipantProgress, ShardingStrategy, TrainingConfig, TrainingProgress,
    TrainingStatus,
};
use crate::registry::{NodeDepartureHook, NodeRegistry};
use crate::selection::NodeSelector;
use crate::transport::{PoolMessage, Transport};

/// Training cannot meaningfully continue with fewer than two contributors.
pub const MIN_TRAINING_PARTICIPANTS: usize = 2;

/// Summary of what a deadline-resolution pass did, consumed by the monitor
/// loop for reporting.
#[derive(Debug, Clone, Default)]
pub struct DeadlineActions {
    pub init_timed_out: Vec<JobId>,
    pub epochs_promoted: Vec<JobId>,
    pub inference_forced: Vec<JobId>,
    pub inference_failed: Vec<JobId>,
}

#[derive(Clone)]
pub struct JobManager {
    config: EngineConfig,
    local_peer: PeerId,
    registry: Arc<NodeRegistry>,
    transport: Arc<dyn Transport>,
    selector: Arc<NodeSelector>,
    training: Arc<RwLock<HashMap<JobId, Arc<RwLock<DistributedTrainingJob>>>>>,
    inference: Arc<RwLock<HashMap<JobId, Arc<RwLock<ModelInferenceJob>>>>>,
}

impl JobManager {
    pub fn new(
        config: EngineConfig,
        local_peer: PeerId,
        registry: Arc<NodeRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let selector = Arc::new(NodeSelector::new(
            config.training_load_ceiling,
            config.inference_load_ceiling,
        ));
        Self {
            config,
            local_peer,
            registry,
            transport,
            selector,
            training: Arc::new(RwLock::new(HashMap::new())),
            inference: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // ---------------------------------------------------------------- submit

    /// Submit a distributed training run. Fails with `InsufficientCapacity`
    /// before any job is created when selection cannot fill the request.
    pub async fn submit_training(
        &self,
        model_id: &str,
        config: TrainingConfig,
        required_nodes: usize,
    ) -> Result<JobId, PoolError> {
        let required = required_nodes.max(MIN_TRAINING_PARTICIPANTS);
        let snapshot = self.registry.list_available().await;
        let selected = self
            .selector
            .select_for_training(&snapshot, required, &config);
        if selected.len() < required {
            return Err(PoolError::InsufficientCapacity {
                required,
                available: selected.len(),
            });
        }

        let now = Utc::now();
        let participants: Vec<PeerId> = selected.iter().map(|n| n.peer_id).collect();
        let job = DistributedTrainingJob {
            id: Uuid::new_v4(),
            model_id: model_id.to_string(),
            coordinator: self.local_peer,
            participants: participants.clone(),
            pending_init: participants.iter().copied().collect(),
            pending_sync: Default::default(),
            progress: TrainingProgress::new(config.epochs),
            config: config.clone(),
            status: TrainingStatus::Initializing,
            started_at: now,
            last_update: now,
            deadline: Some(now + self.chrono(self.config.init_timeout)),
            error: None,
        };
        let id = job.id;
        info!(job = %id, model = model_id, participants = participants.len(), "training job created");

        let arc = Arc::new(RwLock::new(job));
        self.training.write().await.insert(id, arc.clone());

        let mut job = arc.write().await;
        for peer in participants {
            self.registry
                .adjust_load(peer, self.config.training_load_share)
                .await;
            let init = PoolMessage::TrainingInit {
                job_id: id,
                model_id: model_id.to_string(),
                config: config.clone(),
            };
            if let Err(e) = self.transport.send_to_peer(peer, init).await {
                warn!(job = %id, peer = %peer, error = %e, "training init dispatch failed, dropping participant");
                self.remove_participant(&mut job, peer).await;
            }
        }
        self.reevaluate_training(&mut job).await;

        Ok(id)
    }

    /// Submit an inference request. With `allow_partial`, a short selection is
    /// a capacity shortfall the job absorbs; without it, submission is
    /// rejected and no job is created.
    pub async fn submit_inference(
        &self,
        model_id: &str,
        input: serde_json::Value,
        sharding: ShardingStrategy,
        required_nodes: usize,
        allow_partial: bool,
    ) -> Result<JobId, PoolError> {
        let snapshot = self.registry.list_available().await;
        let selected = self
            .selector
            .select_for_inference(&snapshot, required_nodes, model_id);
        if selected.is_empty() || (!allow_partial && selected.len() < required_nodes) {
            return Err(PoolError::InsufficientCapacity {
                required: required_nodes,
                available: selected.len(),
            });
        }

        let now = Utc::now();
        let assigned: Vec<PeerId> = selected.iter().map(|n| n.peer_id).collect();
        let job = ModelInferenceJob {
            id: Uuid::new_v4(),
            model_id: model_id.to_string(),
            input: input.clone(),
            required_nodes,
            sharding,
            assigned_nodes: assigned.clone(),
            status: InferenceStatus::Pending,
            received: Vec::new(),
            results: None,
            performance: None,
            dispatched_at: now,
            last_update: now,
            deadline: None,
            error: None,
        };
        let id = job.id;
        info!(job = %id, model = model_id, assigned = assigned.len(), ?sharding, "inference job created");

        let arc = Arc::new(RwLock::new(job));
        self.inference.write().await.insert(id, arc.clone());

        let mut job = arc.write().await;
        let shard_count = assigned.len();
        for (shard_index, peer) in assigned.into_iter().enumerate() {
            self.registry
                .adjust_load(peer, self.config.inference_load_share)
                .await;
            let dispatch = PoolMessage::InferenceDispatch {
                job_id: id,
                model_id: model_id.to_string(),
                input: input.clone(),
                sharding,
                shard_index,
                shard_count,
            };
            if let Err(e) = self.transport.send_to_peer(peer, dispatch).await {
                warn!(job = %id, peer = %peer, error = %e, "inference dispatch failed, dropping node");
                self.remove_assigned(&mut job, peer).await;
            }
        }

        if job.status == InferenceStatus::Pending {
            if job.assigned_nodes.is_empty() {
                let error = PoolError::ParticipantLoss(id);
                self.fail_inference(&mut job, Some(error), "no assigned node reachable at dispatch")
                    .await;
            } else {
                job.status = InferenceStatus::Processing;
                job.dispatched_at = Utc::now();
                job.deadline =
                    Some(job.dispatched_at + self.chrono(self.config.processing_timeout));
            }
        }

        Ok(id)
    }

    // -------------------------------------------------------------- messages

    /// Apply an inbound peer message to the job it addresses. Messages for
    /// unknown or terminal jobs, or from peers that are not live participants,
    /// are ignored; a late report can never resurrect a cancelled job.
    pub async fn handle_message(&self, peer: PeerId, message: PoolMessage) {
        match message {
            PoolMessage::TrainingInitAck { job_id } => {
                self.apply_init_ack(job_id, peer).await;
            }
            PoolMessage::TrainingProgress {
                job_id,
                epoch,
                local_loss,
            } => {
                self.apply_progress(job_id, peer, epoch, local_loss).await;
            }
            PoolMessage::SyncAck { job_id } => {
                self.apply_sync_ack(job_id, peer).await;
            }
            PoolMessage::InferenceResult {
                job_id,
                output,
                confidence,
                latency_ms,
            } => {
                self.apply_inference_result(job_id, peer, output, confidence, latency_ms)
                    .await;
            }
            // Work requests target the local execution runtime, which lives
            // outside this core.
            other => {
                debug!(peer = %peer, message = ?other, "ignoring non-lifecycle message");
            }
        }
    }

    async fn apply_init_ack(&self, job_id: JobId, peer: PeerId) {
        let Some(arc) = self.training_arc(job_id).await else {
            return;
        };
        let mut job = arc.write().await;
        if job.status != TrainingStatus::Initializing || !job.pending_init.remove(&peer) {
            return;
        }
        job.last_update = Utc::now();
        self.reevaluate_training(&mut job).await;
    }

    async fn apply_progress(&self, job_id: JobId, peer: PeerId, epoch: u32, local_loss: f64) {
        let Some(arc) = self.training_arc(job_id).await else {
            return;
        };
        let mut job = arc.write().await;
        if job.status != TrainingStatus::Training || !job.is_participant(&peer) {
            return;
        }

        let now = Utc::now();
        job.last_update = now;
        job.progress.participants.insert(
            peer,
            ParticipantProgress {
                epoch,
                local_loss,
                reported_at: now,
            },
        );
        self.reevaluate_training(&mut job).await;
    }

    async fn apply_sync_ack(&self, job_id: JobId, peer: PeerId) {
        let Some(arc) = self.training_arc(job_id).await else {
            return;
        };
        let mut job = arc.write().await;
        if job.status != TrainingStatus::Synchronizing || !job.pending_sync.remove(&peer) {
            return;
        }
        job.last_update = Utc::now();
        self.reevaluate_training(&mut job).await;
    }

    async fn apply_inference_result(
        &self,
        job_id: JobId,
        peer: PeerId,
        output: serde_json::Value,
        confidence: f64,
        latency_ms: u64,
    ) {
        let Some(arc) = self.inference_arc(job_id).await else {
            return;
        };
        let mut job = arc.write().await;
        if job.status != InferenceStatus::Processing
            || !job.assigned_nodes.contains(&peer)
            || job.has_reported(&peer)
        {
            return;
        }

        let payload = parse_payload(&output);
        if payload.is_none() {
            warn!(job = %job_id, peer = %peer, "result payload malformed, excluded from aggregation");
        }
        job.received.push(NodeResult {
            peer,
            payload,
            confidence,
            latency_ms,
        });
        job.last_update = Utc::now();

        if job.all_assigned_reported() {
            self.finalize_inference(&mut job).await;
        }
    }

    // ------------------------------------------------------------ departures

    /// Drop `peer` from every in-flight job. Participant lists only ever
    /// shrink; a training job falling below the minimum fails on this very
    /// event.
    pub async fn handle_node_departure(&self, peer: PeerId) {
        let training: Vec<_> = self.training.read().await.values().cloned().collect();
        for arc in training {
            let mut job = arc.write().await;
            if !job.status.is_terminal() && job.is_participant(&peer) {
                self.remove_participant(&mut job, peer).await;
                self.reevaluate_training(&mut job).await;
            }
        }

        let inference: Vec<_> = self.inference.read().await.values().cloned().collect();
        for arc in inference {
            let mut job = arc.write().await;
            if !job.status.is_terminal() && job.assigned_nodes.contains(&peer) {
                self.remove_assigned(&mut job, peer).await;
                self.reevaluate_inference(&mut job).await;
            }
        }
    }

    // --------------------------------------------------------------- queries

    pub async fn training_status(&self, id: JobId) -> Option<DistributedTrainingJob> {
        let arc = self.training_arc(id).await?;
        let job = arc.read().await;
        Some(job.clone())
    }

    pub async fn inference_status(&self, id: JobId) -> Option<ModelInferenceJob> {
        let arc = self.inference_arc(id).await?;
        let job = arc.read().await;
        Some(job.clone())
    }

    pub async fn active_training_jobs(&self) -> usize {
        let mut count = 0;
        for arc in self.training.read().await.values() {
            if !arc.read().await.status.is_terminal() {
                count += 1;
            }
        }
        count
    }

    pub async fn active_inference_jobs(&self) -> usize {
        let mut count = 0;
        for arc in self.inference.read().await.values() {
            if !arc.read().await.status.is_terminal() {
                count += 1;
            }
        }
        count
    }

    // ---------------------------------------------------------- cancellation

    /// Cancel from any non-terminal state. Safe against late messages: once
    /// terminal, nothing transitions the job again.
    pub async fn cancel_training(&self, id: JobId) -> bool {
        let Some(arc) = self.training_arc(id).await else {
            return false;
        };
        let mut job = arc.write().await;
        if job.status.is_terminal() {
            return false;
        }
        self.fail_training(&mut job, None, "cancelled by caller")
            .await;
        true
    }

    pub async fn cancel_inference(&self, id: JobId) -> bool {
        let Some(arc) = self.inference_arc(id).await else {
            return false;
        };
        let mut job = arc.write().await;
        if job.status.is_terminal() {
            return false;
        }
        self.fail_inference(&mut job, None, "cancelled by caller")
            .await;
        true
    }

    /// Drop terminal jobs whose last update is older than `max_age`. Retention
    /// is capped by the caller; nothing is garbage-collected implicitly.
    pub async fn purge_terminal_jobs(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - self.chrono(max_age);
        let mut purged = 0;

        let mut training = self.training.write().await;
        let mut keep = HashMap::new();
        for (id, arc) in training.drain() {
            let (terminal, last_update) = {
                let job = arc.read().await;
                (job.status.is_terminal(), job.last_update)
            };
            if terminal && last_update < cutoff {
                purged += 1;
            } else {
                keep.insert(id, arc);
            }
        }
        *training = keep;
        drop(training);

        let mut inference = self.inference.write().await;
        let mut keep = HashMap::new();
        for (id, arc) in inference.drain() {
            let (terminal, last_update) = {
                let job = arc.read().await;
                (job.status.is_terminal(), job.last_update)
            };
            if terminal && last_update < cutoff {
                purged += 1;
            } else {
                keep.insert(id, arc);
            }
        }
        *inference = keep;

        purged
    }

    // ------------------------------------------------------------- deadlines

    /// Resolve expired cooperative deadlines. Called from the monitor tick;
    /// each waiting state is resolved either here or by an incoming message,
    /// whichever comes first.
    pub async fn resolve_deadlines(&self) -> DeadlineActions {
        let now = Utc::now();
        let mut actions = DeadlineActions::default();

        let training: Vec<_> = self.training.read().await.values().cloned().collect();
        for arc in training {
            let mut job = arc.write().await;
            let Some(deadline) = job.deadline else {
                continue;
            };
            if deadline > now {
                continue;
            }
            match job.status {
                TrainingStatus::Initializing => {
                    let unacked: Vec<PeerId> = job.pending_init.iter().copied().collect();
                    warn!(job = %job.id, unresponsive = unacked.len(), "initialization timeout, dropping unresponsive participants");
                    for peer in unacked {
                        self.remove_participant(&mut job, peer).await;
                    }
                    actions.init_timed_out.push(job.id);
                    self.reevaluate_training(&mut job).await;
                }
                TrainingStatus::Training => {
                    // Missing participants do not block indefinitely: promote
                    // whatever the reporters delivered for this epoch.
                    if self.promote_partial_epoch(&mut job).await {
                        actions.epochs_promoted.push(job.id);
                    }
                }
                _ => {}
            }
        }

        let inference: Vec<_> = self.inference.read().await.values().cloned().collect();
        for arc in inference {
            let mut job = arc.write().await;
            if job.status != InferenceStatus::Processing {
                continue;
            }
            let Some(deadline) = job.deadline else {
                continue;
            };
            if deadline > now {
                continue;
            }
            if job.received.is_empty() {
                let error = PoolError::StallTimeout(job.id);
                self.fail_inference(&mut job, Some(error), "processing timeout with no results")
                    .await;
                actions.inference_failed.push(job.id);
            } else {
                info!(job = %job.id, received = job.received.len(), "processing timeout, aggregating partial results");
                let id = job.id;
                self.finalize_inference(&mut job).await;
                actions.inference_forced.push(id);
            }
        }

        actions
    }

    /// Training jobs with no update for longer than the stall grace period.
    pub async fn stalled_training_jobs(&self) -> Vec<JobId> {
        let cutoff = Utc::now() - self.chrono(self.config.training_stall_timeout);
        let mut stalled = Vec::new();
        for arc in self.training.read().await.values() {
            let job = arc.read().await;
            if !job.status.is_terminal() && job.last_update < cutoff {
                stalled.push(job.id);
            }
        }
        stalled
    }

    // ----------------------------------------------------- internal: training

    async fn training_arc(&self, id: JobId) -> Option<Arc<RwLock<DistributedTrainingJob>>> {
        self.training.read().await.get(&id).cloned()
    }

    async fn inference_arc(&self, id: JobId) -> Option<Arc<RwLock<ModelInferenceJob>>> {
        self.inference.read().await.get(&id).cloned()
    }

    /// Remove one participant and release its load share. Does not by itself
    /// re-run the state machine; callers follow up with `reevaluate_training`.
    async fn remove_participant(&self, job: &mut DistributedTrainingJob, peer: PeerId) {
        if !job.is_participant(&peer) {
            return;
        }
        job.participants.retain(|p| *p != peer);
        job.pending_init.remove(&peer);
        job.pending_sync.remove(&peer);
        job.progress.participants.remove(&peer);
        job.last_update = Utc::now();
        self.registry
            .adjust_load(peer, -self.config.training_load_share)
            .await;
        debug!(job = %job.id, peer = %peer, remaining = job.participants.len(), "participant removed");
    }

    /// Drive the training state machine until it settles. Loops instead of
    /// recursing so sync-dispatch failures can shed participants and re-check.
    async fn reevaluate_training(&self, job: &mut DistributedTrainingJob) {
        loop {
            if job.status.is_terminal() {
                return;
            }
            if job.participants.len() < MIN_TRAINING_PARTICIPANTS {
                let error = PoolError::ParticipantLoss(job.id);
                self.fail_training(job, Some(error), "participant count below minimum")
                    .await;
                return;
            }

            match job.status {
                TrainingStatus::Initializing => {
                    if !job.pending_init.is_empty() {
                        return;
                    }
                    info!(job = %job.id, "all participants acknowledged, training started");
                    job.status = TrainingStatus::Training;
                    job.deadline = Some(Utc::now() + self.chrono(self.config.epoch_timeout));
                    job.last_update = Utc::now();
                }
                TrainingStatus::Training => {
                    let current = job.progress.current_epoch;
                    let reported: Vec<f64> = job
                        .participants
                        .iter()
                        .filter_map(|p| job.progress.participants.get(p))
                        .filter(|p| p.epoch >= current)
                        .map(|p| p.local_loss)
                        .collect();
                    if reported.len() < job.participants.len() {
                        return;
                    }
                    self.advance_epoch(job, &reported).await;
                }
                TrainingStatus::Synchronizing => {
                    if !job.pending_sync.is_empty() {
                        return;
                    }
                    self.complete_training(job).await;
                    return;
                }
                _ => return,
            }
        }
    }

    /// Epoch timeout: advance on whatever subset reported. Returns false when
    /// nobody reported, in which case only the stall flag applies.
    async fn promote_partial_epoch(&self, job: &mut DistributedTrainingJob) -> bool {
        let current = job.progress.current_epoch;
        let reported: Vec<f64> = job
            .participants
            .iter()
            .filter_map(|p| job.progress.participants.get(p))
            .filter(|p| p.epoch >= current)
            .map(|p| p.local_loss)
            .collect();
        if reported.is_empty() {
            return false;
        }
        info!(job = %job.id, epoch = current, reporters = reported.len(), "epoch timeout, promoting partial data");
        self.advance_epoch(job, &reported).await;
        self.reevaluate_training(job).await;
        true
    }

    async fn advance_epoch(&self, job: &mut DistributedTrainingJob, losses: &[f64]) {
        job.progress.global_loss = losses.iter().sum::<f64>() / losses.len() as f64;
        job.last_update = Utc::now();

        if job.progress.current_epoch >= job.progress.total_epochs {
            // Final epoch received; exchange gradients across participants.
            info!(job = %job.id, loss = job.progress.global_loss, "final epoch complete, synchronizing");
            job.status = TrainingStatus::Synchronizing;
            job.pending_sync = job.participants.iter().copied().collect();
            job.deadline = None;

            let participants = job.participants.clone();
            for peer in participants {
                let msg = PoolMessage::SyncRequest { job_id: job.id };
                if let Err(e) = self.transport.send_to_peer(peer, msg).await {
                    warn!(job = %job.id, peer = %peer, error = %e, "sync dispatch failed, dropping participant");
                    self.remove_participant(job, peer).await;
                }
            }
        } else {
            debug!(job = %job.id, epoch = job.progress.current_epoch, loss = job.progress.global_loss, "epoch complete");
            job.progress.current_epoch += 1;
            job.deadline = Some(Utc::now() + self.chrono(self.config.epoch_timeout));
        }
    }

    async fn complete_training(&self, job: &mut DistributedTrainingJob) {
        info!(job = %job.id, loss = job.progress.global_loss, "training job completed");
        job.status = TrainingStatus::Completed;
        job.deadline = None;
        job.last_update = Utc::now();
        for peer in job.participants.clone() {
            self.registry
                .adjust_load(peer, -self.config.training_load_share)
                .await;
        }
    }

    async fn fail_training(
        &self,
        job: &mut DistributedTrainingJob,
        error: Option<PoolError>,
        reason: &str,
    ) {
        warn!(job = %job.id, reason, "training job failed");
        job.status = TrainingStatus::Failed;
        job.error = error;
        job.deadline = None;
        job.last_update = Utc::now();
        for peer in job.participants.clone() {
            self.registry
                .adjust_load(peer, -self.config.training_load_share)
                .await;
        }
    }

    // ---------------------------------------------------- internal: inference

    async fn remove_assigned(&self, job: &mut ModelInferenceJob, peer: PeerId) {
        if !job.assigned_nodes.contains(&peer) {
            return;
        }
        job.assigned_nodes.retain(|p| *p != peer);
        job.last_update = Utc::now();
        self.registry
            .adjust_load(peer, -self.config.inference_load_share)
            .await;
        debug!(job = %job.id, peer = %peer, remaining = job.assigned_nodes.len(), "assigned node removed");
    }

    /// A disconnect that leaves at least one assigned node alive does not
    /// fail the job; aggregation proceeds over whatever subset remains.
    async fn reevaluate_inference(&self, job: &mut ModelInferenceJob) {
        if !matches!(
            job.status,
            InferenceStatus::Pending | InferenceStatus::Processing
        ) {
            return;
        }
        if job.assigned_nodes.is_empty() && job.received.is_empty() {
            let error = PoolError::ParticipantLoss(job.id);
            self.fail_inference(job, Some(error), "all assigned nodes lost before any result")
                .await;
            return;
        }
        if job.assigned_nodes.is_empty() || job.all_assigned_reported() {
            self.finalize_inference(job).await;
        }
    }

    async fn finalize_inference(&self, job: &mut ModelInferenceJob) {
        job.status = InferenceStatus::Aggregating;
        job.last_update = Utc::now();

        match aggregation::aggregate(&job.received, job.sharding) {
            Ok(result) => {
                let latency_ms = (Utc::now() - job.dispatched_at).num_milliseconds().max(0) as u64;
                job.performance =
                    Some(InferencePerformance::measure(latency_ms, job.received.len()));
                job.results = Some(result);
                job.status = InferenceStatus::Completed;
                job.deadline = None;
                info!(job = %job.id, latency_ms, "inference job completed");
            }
            Err(e) => {
                // Every received result was malformed; nothing to return.
                let reason = e.to_string();
                self.fail_inference(job, Some(e), &reason).await;
                return;
            }
        }

        for peer in job.assigned_nodes.clone() {
            self.registry
                .adjust_load(peer, -self.config.inference_load_share)
                .await;
        }
    }

    async fn fail_inference(
        &self,
        job: &mut ModelInferenceJob,
        error: Option<PoolError>,
        reason: &str,
    ) {
        warn!(job = %job.id, reason, "inference job failed");
        job.status = InferenceStatus::Failed;
        job.error = error;
        job.deadline = None;
        job.last_update = Utc::now();
        for peer in job.assigned_nodes.clone() {
            self.registry
                .adjust_load(peer, -self.config.inference_load_share)
                .await;
        }
    }

    fn chrono(&self, d: Duration) -> ChronoDuration {
        ChronoDuration::from_std(d).unwrap_or_else(|_| ChronoDuration::seconds(0))
    }
}

#[async_trait::async_trait]
impl NodeDepartureHook for JobManager {
    async fn node_departed(&self, peer: PeerId) {
        self.handle_node_departure(peer).await;
    }
}

/// A result payload is usable only if it is a JSON array of numbers.
fn parse_payload(output: &serde_json::Value) -> Option<Vec<f64>> {
    output
        .as_array()?
        .iter()
        .map(|v| v.as_f64())
        .collect::<Option<Vec<f64>>>()
}
