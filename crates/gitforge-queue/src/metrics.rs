use serde::Serialize;

/// Mutable accumulators behind the queue's internal lock.
#[derive(Debug, Default)]
pub(crate) struct MetricsInner {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub cancelled: u64,
    pub total_processing_time: f64,
}

/// Point-in-time snapshot returned by `get_metrics`. Reading
/// this never blocks on queue activity.
#[derive(Debug, Clone, Serialize)]
pub struct QueueMetrics {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub cancelled: u64,
    pub avg_processing_time_seconds: f64,
    pub queue_size: usize,
    pub active_count: usize,
    pub max_concurrent: usize,
    pub available_slots: usize,
}
