use std::sync::Arc;
use std::time::Instant;

use crate::registry::Registry;

/// RAII guard recording a Git operation's duration and success/failure into
/// `git_operations_total`/`clone_duration_seconds` on drop. The call site
/// wraps its fallible block and marks the guard as failed explicitly.
pub struct GitOperationTimer {
    registry: Arc<Registry>,
    operation: String,
    start: Instant,
    failed_status: Option<&'static str>,
}

impl GitOperationTimer {
    pub fn start(registry: Arc<Registry>, operation: impl Into<String>) -> Self {
        Self {
            registry,
            operation: operation.into(),
            start: Instant::now(),
            failed_status: None,
        }
    }

    /// Marks the operation failed, recording `status` on drop. `status`
    /// must be one of the closed `git_operations_total` status values
    /// (`AppError::metric_status()` supplies these).
    pub fn mark_failed(&mut self, status: &'static str) {
        self.failed_status = Some(status);
    }
}

impl Drop for GitOperationTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        if let Some(status) = self.failed_status {
            self.registry.record_git_operation(&self.operation, status);
            return;
        }
        if self.operation == "clone" {
            self.registry.record_clone(duration, "unknown");
        } else {
            self.registry.record_git_operation(&self.operation, "success");
        }
    }
}

/// RAII guard pairing `record_task_start`/`record_task_complete` on a
/// `MetricsCollector`, for call sites that can't cleanly bracket a task
/// with explicit start/complete calls.
pub struct TaskTimer<'a> {
    collector: &'a crate::registry::MetricsCollector,
    task_id: uuid::Uuid,
    status: &'static str,
}

impl<'a> TaskTimer<'a> {
    pub fn start(
        collector: &'a crate::registry::MetricsCollector,
        task_id: uuid::Uuid,
        operation: &str,
    ) -> Self {
        collector.record_task_start(task_id, operation);
        Self {
            collector,
            task_id,
            status: "success",
        }
    }

    pub fn mark_failed(&mut self) {
        self.status = "failed";
    }
}

impl Drop for TaskTimer<'_> {
    fn drop(&mut self) {
        self.collector.record_task_complete(self.task_id, self.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricsCollector;

    #[test]
    fn git_operation_timer_records_failure_on_mark() {
        let registry = Arc::new(Registry::new().unwrap());
        {
            let mut timer = GitOperationTimer::start(registry.clone(), "push");
            timer.mark_failed("auth_failed");
        }
        let text = registry.gather_text().unwrap();
        assert!(text.contains("operation=\"push\""));
        assert!(text.contains("status=\"auth_failed\""));
    }

    #[test]
    fn task_timer_completes_on_drop() {
        let registry = Arc::new(Registry::new().unwrap());
        let collector = MetricsCollector::new(registry.clone());
        let id = uuid::Uuid::new_v4();
        {
            let _timer = TaskTimer::start(&collector, id, "clone");
        }
        assert_eq!(registry.gather_text().unwrap().contains("gitforge_active_tasks 0"), true);
    }
}
