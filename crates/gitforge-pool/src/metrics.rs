/// Mutable accumulators behind the pool's internal lock.
#[derive(Debug, Default)]
pub(crate) struct PoolMetricsInner {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub total_workers_created: u64,
    pub total_workers_failed: u64,
}
