use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntGauge, Opts, TextEncoder,
};
use uuid::Uuid;

const TASK_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];
const CLONE_DURATION_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0];

/// Prometheus-backed metrics registry. One instance per process;
/// `gather_text` renders the exposition format for a scrape endpoint.
pub struct Registry {
    registry: prometheus::Registry,
    tasks_total: CounterVec,
    task_duration: HistogramVec,
    active_tasks: IntGauge,
    queued_tasks: IntGauge,
    worker_count: IntGauge,
    workspace_count: IntGauge,
    workspace_disk_usage: IntGauge,
    workspace_size_limit: IntGauge,
    git_operations_total: CounterVec,
    clone_duration: HistogramVec,
    cache_hits: CounterVec,
    cache_misses: CounterVec,
    cache_size: GaugeVec,
    server_info: GaugeVec,
}

impl Registry {
    pub fn new() -> Result<Self, anyhow::Error> {
        let registry = prometheus::Registry::new();

        let tasks_total = CounterVec::new(
            Opts::new("gitforge_tasks_total", "Total number of tasks processed"),
            &["operation", "status"],
        )?;
        let task_duration = HistogramVec::new(
            HistogramOpts::new("gitforge_task_duration_seconds", "Task execution duration in seconds")
                .buckets(TASK_DURATION_BUCKETS.to_vec()),
            &["operation"],
        )?;
        let active_tasks = IntGauge::new("gitforge_active_tasks", "Number of tasks currently running")?;
        let queued_tasks = IntGauge::new("gitforge_queued_tasks", "Number of tasks waiting in queue")?;
        let worker_count = IntGauge::new("gitforge_worker_count", "Number of active workers")?;
        let workspace_count = IntGauge::new("gitforge_workspace_count", "Number of active workspaces")?;
        let workspace_disk_usage = IntGauge::new(
            "gitforge_workspace_disk_usage_bytes",
            "Total disk usage by workspaces",
        )?;
        let workspace_size_limit = IntGauge::new(
            "gitforge_workspace_size_limit_bytes",
            "Maximum workspace size in bytes",
        )?;
        let git_operations_total = CounterVec::new(
            Opts::new("gitforge_git_operations_total", "Total number of Git operations"),
            &["operation", "status"],
        )?;
        let clone_duration = HistogramVec::new(
            HistogramOpts::new("gitforge_clone_duration_seconds", "Repository clone duration in seconds")
                .buckets(CLONE_DURATION_BUCKETS.to_vec()),
            &["repository_type"],
        )?;
        let cache_hits = CounterVec::new(
            Opts::new("gitforge_cache_hits_total", "Total number of cache hits"),
            &["cache_type"],
        )?;
        let cache_misses = CounterVec::new(
            Opts::new("gitforge_cache_misses_total", "Total number of cache misses"),
            &["cache_type"],
        )?;
        let cache_size = GaugeVec::new(
            Opts::new("gitforge_cache_size", "Current number of entries in the cache"),
            &["cache_type"],
        )?;
        let server_info = GaugeVec::new(
            Opts::new("gitforge_server_info", "Information about the gitforge server"),
            &["version", "rust_version"],
        )?;

        registry.register(Box::new(tasks_total.clone()))?;
        registry.register(Box::new(task_duration.clone()))?;
        registry.register(Box::new(active_tasks.clone()))?;
        registry.register(Box::new(queued_tasks.clone()))?;
        registry.register(Box::new(worker_count.clone()))?;
        registry.register(Box::new(workspace_count.clone()))?;
        registry.register(Box::new(workspace_disk_usage.clone()))?;
        registry.register(Box::new(workspace_size_limit.clone()))?;
        registry.register(Box::new(git_operations_total.clone()))?;
        registry.register(Box::new(clone_duration.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(cache_size.clone()))?;
        registry.register(Box::new(server_info.clone()))?;

        Ok(Self {
            registry,
            tasks_total,
            task_duration,
            active_tasks,
            queued_tasks,
            worker_count,
            workspace_count,
            workspace_disk_usage,
            workspace_size_limit,
            git_operations_total,
            clone_duration,
            cache_hits,
            cache_misses,
            cache_size,
            server_info,
        })
    }

    pub fn record_git_operation(&self, operation: &str, status: &str) {
        self.git_operations_total.with_label_values(&[operation, status]).inc();
    }

    pub fn record_clone(&self, duration_secs: f64, repository_type: &str) {
        self.clone_duration.with_label_values(&[repository_type]).observe(duration_secs);
        self.git_operations_total.with_label_values(&["clone", "success"]).inc();
    }

    pub fn update_queue_size(&self, size: i64) {
        self.queued_tasks.set(size);
    }

    pub fn update_worker_count(&self, count: i64) {
        self.worker_count.set(count);
    }

    pub fn update_workspace_metrics(&self, count: i64, disk_usage: i64, limit: i64) {
        self.workspace_count.set(count);
        self.workspace_disk_usage.set(disk_usage);
        self.workspace_size_limit.set(limit);
    }

    /// Sets the server-info gauge: one time series at value `1`, labeled
    /// with the build's version/toolchain, the standard way a client
    /// library without a dedicated info metric exposes static labels.
    pub fn set_server_info(&self, version: &str, rust_version: &str) {
        self.server_info.reset();
        self.server_info.with_label_values(&[version, rust_version]).set(1.0);
    }

    pub fn record_cache_hit(&self, cache_type: &str) {
        self.cache_hits.with_label_values(&[cache_type]).inc();
    }

    pub fn record_cache_miss(&self, cache_type: &str) {
        self.cache_misses.with_label_values(&[cache_type]).inc();
    }

    pub fn update_cache_size(&self, cache_type: &str, size: usize) {
        self.cache_size.with_label_values(&[cache_type]).set(size as f64);
    }

    pub fn gather_text(&self) -> Result<String, anyhow::Error> {
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Pairs task start/completion and records duration + status, mirroring
/// `MetricsCollector.record_task_start`/`record_task_complete`.
pub struct MetricsCollector {
    registry: std::sync::Arc<Registry>,
    task_start_times: Mutex<HashMap<Uuid, (String, Instant)>>,
}

impl MetricsCollector {
    pub fn new(registry: std::sync::Arc<Registry>) -> Self {
        Self {
            registry,
            task_start_times: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_task_start(&self, task_id: Uuid, operation: &str) {
        self.task_start_times
            .lock()
            .unwrap()
            .insert(task_id, (operation.to_string(), Instant::now()));
        self.registry.active_tasks.inc();
    }

    pub fn record_task_complete(&self, task_id: Uuid, status: &str) {
        let started = self.task_start_times.lock().unwrap().remove(&task_id);
        if let Some((operation, start)) = started {
            let duration = start.elapsed().as_secs_f64();
            self.registry
                .tasks_total
                .with_label_values(&[&operation, status])
                .inc();
            self.registry
                .task_duration
                .with_label_values(&[&operation])
                .observe(duration);
        }
        self.registry.active_tasks.dec();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_lifecycle_updates_counters_and_gauge() {
        let registry = std::sync::Arc::new(Registry::new().unwrap());
        let collector = MetricsCollector::new(registry.clone());
        let id = Uuid::new_v4();

        collector.record_task_start(id, "clone");
        assert_eq!(registry.active_tasks.get(), 1);

        collector.record_task_complete(id, "success");
        assert_eq!(registry.active_tasks.get(), 0);

        let text = registry.gather_text().unwrap();
        assert!(text.contains("gitforge_tasks_total"));
    }

    #[test]
    fn record_task_complete_without_start_only_decrements_gauge() {
        let registry = std::sync::Arc::new(Registry::new().unwrap());
        let collector = MetricsCollector::new(registry.clone());
        collector.record_task_complete(Uuid::new_v4(), "success");
        assert_eq!(registry.active_tasks.get(), -1);
    }

    #[test]
    fn cache_metrics_round_trip() {
        let registry = Registry::new().unwrap();
        registry.record_cache_hit("git");
        registry.record_cache_miss("git");
        registry.update_cache_size("git", 4);
        let text = registry.gather_text().unwrap();
        assert!(text.contains("gitforge_cache_hits_total"));
        assert!(text.contains("gitforge_cache_size"));
    }

    #[test]
    fn workspace_and_server_info_metrics_are_exposed() {
        let registry = Registry::new().unwrap();
        registry.update_workspace_metrics(3, 1024, 4096);
        registry.set_server_info("0.1.0", "1.80.0");
        let text = registry.gather_text().unwrap();
        assert!(text.contains("gitforge_workspace_count 3"));
        assert!(text.contains("gitforge_workspace_disk_usage_bytes 1024"));
        assert!(text.contains("gitforge_workspace_size_limit_bytes 4096"));
        assert!(text.contains("gitforge_server_info"));
        assert!(text.contains(r#"version="0.1.0""#));
    }
}
