//! Data-model projections for the worker pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gitforge_core::constants::WORKER_HEARTBEAT_TIMEOUT_SECS;

/// Worker lifecycle states.
///
/// ```text
/// STARTING → IDLE → BUSY ⇄ IDLE → STOPPING → (removed)
///                        ↘ FAILED → (replaced)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Starting,
    Running,
    Idle,
    Busy,
    Stopping,
    Failed,
    Unknown,
}

/// A data-model snapshot of a pool worker. The running task (if any) is
/// driven by the worker loop; this is what `get_workers`/`get_worker`
/// return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub status: WorkerStatus,
    pub current_task_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub cpu_usage: f32,
    pub memory_usage: u64,
}

impl Worker {
    pub(crate) fn new(id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            status: WorkerStatus::Starting,
            current_task_id: None,
            started_at: now,
            last_heartbeat: now,
            tasks_completed: 0,
            tasks_failed: 0,
            cpu_usage: 0.0,
            memory_usage: 0,
        }
    }

    /// Healthy iff the status is operational and the heartbeat hasn't gone
    /// stale.
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status,
            WorkerStatus::Running | WorkerStatus::Idle | WorkerStatus::Busy
        ) && (Utc::now() - self.last_heartbeat).num_seconds() < WORKER_HEARTBEAT_TIMEOUT_SECS
    }
}

/// Pool-wide metrics snapshot returned by `get_metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub success_rate: f64,
    pub worker_count: usize,
    pub healthy_workers: usize,
    pub busy_workers: usize,
    pub idle_workers: usize,
    pub queue_size: usize,
    pub total_workers_created: u64,
    pub total_workers_failed: u64,
}
