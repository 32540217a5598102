//! Core data shapes shared by the queue, pool, audit, and dispatch crates

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheduling priority. Higher values are scheduled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low = 0,
    Normal = 5,
    High = 10,
    Critical = 15,
}

impl Priority {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Lifecycle status of a submitted task, surfaced via `get_task`/`list_tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Data-model projection of a queued task, used for introspection, audit,
/// and the `get_task`/`list_tasks` operations. The actual deferred
/// invocation (the "work") is held only inside the queue's internal heap
/// entry, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub priority: Priority,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub retries: u32,
    pub max_retries: u32,
    pub status: TaskStatus,
}

impl TaskRecord {
    pub fn new(priority: Priority, max_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            created_at: chrono::Utc::now(),
            retries: 0,
            max_retries,
            status: TaskStatus::Pending,
        }
    }
}
