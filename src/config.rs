use tokio::time::Duration;

/// Tunable parameters for scheduling, timeouts and the monitor loop.
///
/// The defaults mirror the production constants; tests override individual
/// fields to exercise timeout paths quickly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Nodes above this load are not considered for training work.
    pub training_load_ceiling: f64,
    /// Inference tolerates more load because individual requests are shorter.
    pub inference_load_ceiling: f64,
    /// Load added to each participant while a training job is live.
    pub training_load_share: f64,
    /// Load added to each assigned node while an inference job is live.
    pub inference_load_share: f64,

    /// How long to wait for all participants to acknowledge initialization.
    pub init_timeout: Duration,
    /// How long to wait for all participants to report an epoch before
    /// promoting partial data.
    pub epoch_timeout: Duration,
    /// How long an inference job may sit in `Processing` before aggregation
    /// is forced over whatever subset has reported.
    pub processing_timeout: Duration,
    /// A training job with no update for this long is flagged as stalled.
    pub training_stall_timeout: Duration,

    /// Monitor loop tick interval.
    pub monitor_interval: Duration,
    /// Nodes silent for this long are marked offline by the monitor.
    pub heartbeat_timeout: Duration,
    /// Margin above/below the mean load that counts as imbalance.
    pub load_imbalance_margin: f64,

    /// Terminal jobs older than this are eligible for purging.
    pub terminal_retention: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            training_load_ceiling: 0.7,
            inference_load_ceiling: 0.8,
            training_load_share: 0.3,
            inference_load_share: 0.15,
            init_timeout: Duration::from_secs(15),
            epoch_timeout: Duration::from_secs(30),
            processing_timeout: Duration::from_secs(30),
            training_stall_timeout: Duration::from_secs(300),
            monitor_interval: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(60),
            load_imbalance_margin: 0.3,
            terminal_retention: Duration::from_secs(3600),
        }
    }
}
