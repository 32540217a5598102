//! Worker pool: long-lived workers draining a bounded job
//! channel, with a supervisor that replaces unhealthy workers and a scaler
//! that grows or shrinks the pool with load.

mod callbacks;
mod job;
mod metrics;
mod model;
mod processor;
mod worker;

pub use callbacks::{
    Callbacks, OnTaskAssigned, OnTaskCompleted, OnTaskFailed, OnWorkerFailure, OnWorkerStart,
    OnWorkerStop, UnitFuture,
};
pub use model::{PoolMetrics, Worker, WorkerStatus};
pub use processor::{ProcessorFuture, TaskProcessor};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use gitforge_core::constants::SUPERVISOR_INTERVAL_SECS;
use sysinfo::System;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use callbacks::Callbacks as PoolCallbacks;
use job::Job;
use metrics::PoolMetricsInner;
use processor::TaskProcessor as Processor;
use worker::WorkerHandle;

type JobReceiver = Arc<AsyncMutex<mpsc::Receiver<Job>>>;

struct Inner {
    min_workers: usize,
    max_workers: usize,
    max_tasks_per_worker: u64,
    scale_up_threshold: f64,
    scale_down_threshold: f64,
    scale_interval: Duration,
    job_channel_capacity: usize,

    workers: Mutex<HashMap<Uuid, Arc<WorkerHandle>>>,
    task_assignments: Mutex<HashMap<String, Uuid>>,
    job_tx: Mutex<Option<mpsc::Sender<Job>>>,
    job_rx: Mutex<Option<JobReceiver>>,

    running: AtomicBool,
    metrics: Mutex<PoolMetricsInner>,
    callbacks: Mutex<PoolCallbacks>,
    task_processor: Mutex<Option<Processor>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    scaler: Mutex<Option<JoinHandle<()>>>,
    system: Mutex<System>,
}

/// A pool of long-lived workers draining a shared job channel. Cheap to
/// clone (wraps an `Arc`).
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    pub fn new(
        min_workers: usize,
        max_workers: usize,
        max_tasks_per_worker: u64,
        scale_up_threshold: f64,
        scale_down_threshold: f64,
        scale_interval_secs: u64,
        job_channel_capacity: usize,
    ) -> Self {
        let inner = Arc::new(Inner {
            min_workers,
            max_workers,
            max_tasks_per_worker,
            scale_up_threshold,
            scale_down_threshold,
            scale_interval: Duration::from_secs(scale_interval_secs),
            job_channel_capacity,
            workers: Mutex::new(HashMap::new()),
            task_assignments: Mutex::new(HashMap::new()),
            job_tx: Mutex::new(None),
            job_rx: Mutex::new(None),
            running: AtomicBool::new(false),
            metrics: Mutex::new(PoolMetricsInner::default()),
            callbacks: Mutex::new(PoolCallbacks::default()),
            task_processor: Mutex::new(None),
            supervisor: Mutex::new(None),
            scaler: Mutex::new(None),
            system: Mutex::new(System::new()),
        });
        Self { inner }
    }

    pub fn set_callbacks(
        &self,
        on_worker_start: Option<OnWorkerStart>,
        on_worker_stop: Option<OnWorkerStop>,
        on_worker_failure: Option<OnWorkerFailure>,
        on_task_assigned: Option<OnTaskAssigned>,
        on_task_completed: Option<OnTaskCompleted>,
        on_task_failed: Option<OnTaskFailed>,
    ) {
        *self.inner.callbacks.lock().unwrap() = PoolCallbacks {
            on_worker_start,
            on_worker_stop,
            on_worker_failure,
            on_task_assigned,
            on_task_completed,
            on_task_failed,
        };
    }

    pub fn set_task_processor(&self, processor: TaskProcessor) {
        *self.inner.task_processor.lock().unwrap() = Some(processor);
    }

    /// Idempotent. Spawns the supervisor and scaler loops, then brings the
    /// pool up to `min_workers`.
    pub async fn start(&self) {
        if self.inner.running.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        tracing::info!(
            min_workers = self.inner.min_workers,
            max_workers = self.inner.max_workers,
            "starting worker pool"
        );

        let (tx, rx) = mpsc::channel(self.inner.job_channel_capacity.max(1));
        *self.inner.job_tx.lock().unwrap() = Some(tx);
        *self.inner.job_rx.lock().unwrap() = Some(Arc::new(AsyncMutex::new(rx)));

        let supervisor = tokio::spawn(supervisor_loop(self.inner.clone()));
        *self.inner.supervisor.lock().unwrap() = Some(supervisor);

        let scaler = tokio::spawn(scaling_loop(self.inner.clone()));
        *self.inner.scaler.lock().unwrap() = Some(scaler);

        for i in 0..self.inner.min_workers {
            create_worker(&self.inner, format!("worker-{}", i + 1)).await;
        }

        tracing::info!(worker_count = self.get_worker_count(), "worker pool started");
    }

    /// Idempotent. `graceful=true` waits for the job channel to drain
    /// before tearing down workers; either way every worker is cancelled
    /// and awaited before returning.
    pub async fn stop(&self, graceful: bool) {
        if !self.inner.running.swap(false, AtomicOrdering::SeqCst) {
            return;
        }
        tracing::info!(graceful, "stopping worker pool");

        if let Some(handle) = self.inner.scaler.lock().unwrap().take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(handle) = self.inner.supervisor.lock().unwrap().take() {
            handle.abort();
            let _ = handle.await;
        }

        if graceful {
            while pending_jobs(&self.inner) > 0 {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }

        let worker_ids: Vec<Uuid> = self.inner.workers.lock().unwrap().keys().copied().collect();
        for id in worker_ids {
            stop_worker(&self.inner, id).await;
        }

        *self.inner.job_tx.lock().unwrap() = None;
        *self.inner.job_rx.lock().unwrap() = None;

        tracing::info!("worker pool stopped");
    }

    /// Pushes onto the job channel. Returns `false` if the pool isn't
    /// running or the channel is at capacity (backpressure).
    pub fn submit_task(&self, task_id: String, task_data: serde_json::Value, priority: i32) -> bool {
        if !self.inner.running.load(AtomicOrdering::SeqCst) {
            return false;
        }
        let tx = self.inner.job_tx.lock().unwrap().clone();
        let Some(tx) = tx else { return false };
        let job = Job {
            priority,
            task_id: task_id.clone(),
            task_data,
        };
        match tx.try_send(job) {
            Ok(()) => {
                self.inner.metrics.lock().unwrap().total_tasks += 1;
                true
            }
            Err(_) => {
                tracing::warn!(task_id = %task_id, "job channel full, task rejected");
                false
            }
        }
    }

    pub fn get_worker_count(&self) -> usize {
        self.inner.workers.lock().unwrap().len()
    }

    pub fn get_workers(&self) -> Vec<Worker> {
        self.inner
            .workers
            .lock()
            .unwrap()
            .values()
            .map(|h| h.state.lock().unwrap().clone())
            .collect()
    }

    pub fn get_worker(&self, worker_id: Uuid) -> Option<Worker> {
        self.inner
            .workers
            .lock()
            .unwrap()
            .get(&worker_id)
            .map(|h| h.state.lock().unwrap().clone())
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        let m = self.inner.metrics.lock().unwrap();
        let workers = self.get_workers();
        let healthy_workers = workers.iter().filter(|w| w.is_healthy()).count();
        let busy_workers = workers
            .iter()
            .filter(|w| w.status == WorkerStatus::Busy)
            .count();
        PoolMetrics {
            total_tasks: m.total_tasks,
            completed_tasks: m.completed_tasks,
            failed_tasks: m.failed_tasks,
            success_rate: if m.total_tasks > 0 {
                m.completed_tasks as f64 / m.total_tasks as f64
            } else {
                0.0
            },
            worker_count: workers.len(),
            healthy_workers,
            busy_workers,
            idle_workers: healthy_workers.saturating_sub(busy_workers),
            queue_size: pending_jobs(&self.inner),
            total_workers_created: m.total_workers_created,
            total_workers_failed: m.total_workers_failed,
        }
    }

    /// Forces the pool to `target_count` workers, clamped to
    /// `[min_workers, max_workers]`. Scale-down only removes idle workers;
    /// it stops early if none are available.
    pub async fn force_scale(&self, target_count: usize) -> usize {
        let target_count = target_count.clamp(self.inner.min_workers, self.inner.max_workers);
        let current_count = self.inner.workers.lock().unwrap().len();

        if target_count > current_count {
            for i in 0..(target_count - current_count) {
                create_worker(&self.inner, format!("worker-force-{}", i + 1)).await;
            }
        } else if target_count < current_count {
            for _ in 0..(current_count - target_count) {
                match find_idle_worker(&self.inner) {
                    Some(id) => stop_worker(&self.inner, id).await,
                    None => break,
                }
            }
        }

        self.inner.workers.lock().unwrap().len()
    }

    /// Walks `task_assignments`; any assignment whose owning worker's
    /// heartbeat is older than `timeout_secs` is marked failed and cleared.
    pub fn cleanup_stale_tasks(&self, timeout_secs: i64) -> usize {
        let mut cleaned = 0;
        let assignments: Vec<(String, Uuid)> = self
            .inner
            .task_assignments
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        for (task_id, worker_id) in assignments {
            let handle = self.inner.workers.lock().unwrap().get(&worker_id).cloned();
            let Some(handle) = handle else { continue };

            let should_clean = {
                let mut state = handle.state.lock().unwrap();
                if state.current_task_id.as_deref() == Some(task_id.as_str()) {
                    let elapsed = (Utc::now() - state.last_heartbeat).num_seconds();
                    if elapsed > timeout_secs {
                        state.tasks_failed += 1;
                        state.current_task_id = None;
                        state.status = WorkerStatus::Idle;
                        true
                    } else {
                        false
                    }
                } else {
                    false
                }
            };

            if should_clean {
                self.inner.metrics.lock().unwrap().failed_tasks += 1;
                self.inner.task_assignments.lock().unwrap().remove(&task_id);
                cleaned += 1;
                tracing::warn!(task_id = %task_id, worker_id = %worker_id, "stale task cleaned up");
            }
        }

        cleaned
    }
}

fn pending_jobs(inner: &Inner) -> usize {
    if inner.job_channel_capacity == 0 {
        return 0;
    }
    let tx = inner.job_tx.lock().unwrap().clone();
    match tx {
        Some(tx) => inner.job_channel_capacity.saturating_sub(tx.capacity()),
        None => 0,
    }
}

fn queue_usage(inner: &Inner) -> f64 {
    if inner.job_channel_capacity == 0 {
        return 0.0;
    }
    pending_jobs(inner) as f64 / inner.job_channel_capacity as f64
}

/// How many workers to add for a given `usage`, bounded by remaining
/// headroom under `max_workers`. Monotonic in `usage`: higher usage never
/// yields fewer new workers (until headroom is exhausted).
fn scale_up_count(usage: f64, max_workers: usize, current_count: usize) -> usize {
    (max_workers - current_count).min(((usage * 5.0) as usize).max(1))
}

/// How many workers to remove for a given `usage`, bounded by remaining
/// headroom above `min_workers`. Monotonic in the gap below
/// `scale_down_threshold`: the further below threshold, the more workers are
/// removed (until headroom is exhausted).
fn scale_down_count(usage: f64, scale_down_threshold: f64, min_workers: usize, current_count: usize) -> usize {
    (current_count - min_workers).min((((scale_down_threshold - usage) * 10.0) as usize).max(1))
}

fn find_idle_worker(inner: &Inner) -> Option<Uuid> {
    inner
        .workers
        .lock()
        .unwrap()
        .iter()
        .find(|(_, h)| h.state.lock().unwrap().status == WorkerStatus::Idle)
        .map(|(id, _)| *id)
}

fn refresh_telemetry(inner: &Inner, state: &mut Worker) {
    let Ok(mut sys) = inner.system.lock() else {
        return;
    };
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpus = sys.cpus();
    state.cpu_usage = if cpus.is_empty() {
        0.0
    } else {
        cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
    };
    state.memory_usage = sys.used_memory();
}

async fn create_worker(inner: &Arc<Inner>, name: String) -> Uuid {
    let id = Uuid::new_v4();
    let worker = Worker::new(id, name.clone());
    let cancel = CancellationToken::new();
    let handle = Arc::new(WorkerHandle {
        state: Mutex::new(worker.clone()),
        cancel: cancel.clone(),
        join: Mutex::new(None),
    });
    inner.workers.lock().unwrap().insert(id, handle.clone());
    inner.metrics.lock().unwrap().total_workers_created += 1;

    let job_rx = inner.job_rx.lock().unwrap().clone();
    if let Some(job_rx) = job_rx {
        let inner2 = inner.clone();
        let worker_task = tokio::spawn(worker_loop(inner2, id, job_rx, cancel));
        let inner3 = inner.clone();
        let watcher = tokio::spawn(async move {
            match worker_task.await {
                Ok(()) => {}
                Err(join_err) if join_err.is_panic() => {
                    tracing::error!(worker_id = %id, "worker loop panicked");
                    if let Some(h) = inner3.workers.lock().unwrap().get(&id) {
                        h.state.lock().unwrap().status = WorkerStatus::Failed;
                    }
                    inner3.metrics.lock().unwrap().total_workers_failed += 1;
                    let cb = inner3.callbacks.lock().unwrap().on_worker_failure.clone();
                    if let Some(cb) = cb {
                        cb(id, "worker loop panicked".to_string()).await;
                    }
                }
                Err(_) => {}
            }
        });
        *handle.join.lock().unwrap() = Some(watcher);
    } else {
        tracing::error!(worker_id = %id, "no job channel receiver available; worker not started");
    }

    tracing::info!(worker_id = %id, name = %name, "worker created");

    let cb = inner.callbacks.lock().unwrap().on_worker_start.clone();
    if let Some(cb) = cb {
        cb(worker).await;
    }

    id
}

/// Sets `STOPPING`, cancels the worker's loop, and awaits its supervising
/// task before removing it from tracking.
async fn stop_worker(inner: &Arc<Inner>, worker_id: Uuid) {
    let handle = inner.workers.lock().unwrap().get(&worker_id).cloned();
    let Some(handle) = handle else { return };

    let name = {
        let mut state = handle.state.lock().unwrap();
        state.status = WorkerStatus::Stopping;
        state.name.clone()
    };
    tracing::info!(worker_id = %worker_id, name = %name, "stopping worker");

    handle.cancel.cancel();
    let join = handle.join.lock().unwrap().take();
    if let Some(join) = join {
        let _ = join.await;
    }

    let worker_snapshot = inner
        .workers
        .lock()
        .unwrap()
        .remove(&worker_id)
        .map(|h| h.state.lock().unwrap().clone());

    let cb = inner.callbacks.lock().unwrap().on_worker_stop.clone();
    if let (Some(cb), Some(worker)) = (cb, worker_snapshot) {
        cb(worker).await;
    }
}

async fn worker_loop(inner: Arc<Inner>, worker_id: Uuid, job_rx: JobReceiver, cancel: CancellationToken) {
    if let Some(handle) = inner.workers.lock().unwrap().get(&worker_id) {
        let mut state = handle.state.lock().unwrap();
        state.status = WorkerStatus::Idle;
        state.last_heartbeat = Utc::now();
    }

    loop {
        if cancel.is_cancelled() || !inner.running.load(AtomicOrdering::SeqCst) {
            break;
        }

        // `mpsc::Receiver::recv` is cancel-safe: if `cancel` fires first,
        // no job is consumed and the loop exits without needing to put
        // anything back.
        let job = {
            let mut rx = job_rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        {
            let workers = inner.workers.lock().unwrap();
            if let Some(handle) = workers.get(&worker_id) {
                let mut state = handle.state.lock().unwrap();
                state.status = WorkerStatus::Busy;
                state.current_task_id = Some(job.task_id.clone());
                state.last_heartbeat = Utc::now();
            }
        }
        inner
            .task_assignments
            .lock()
            .unwrap()
            .insert(job.task_id.clone(), worker_id);

        let on_assigned = inner.callbacks.lock().unwrap().on_task_assigned.clone();
        if let Some(cb) = on_assigned {
            cb(worker_id, job.task_id.clone()).await;
        }

        let processor = inner.task_processor.lock().unwrap().clone();
        let outcome = match processor {
            Some(processor) => processor(job.task_id.clone(), job.task_data.clone()).await,
            None => Ok(()),
        };

        match outcome {
            Ok(()) => {
                if let Some(handle) = inner.workers.lock().unwrap().get(&worker_id) {
                    handle.state.lock().unwrap().tasks_completed += 1;
                }
                inner.metrics.lock().unwrap().completed_tasks += 1;
                tracing::debug!(worker_id = %worker_id, task_id = %job.task_id, "task completed");
                let cb = inner.callbacks.lock().unwrap().on_task_completed.clone();
                if let Some(cb) = cb {
                    cb(worker_id, job.task_id.clone(), None).await;
                }
            }
            Err(err) => {
                if let Some(handle) = inner.workers.lock().unwrap().get(&worker_id) {
                    handle.state.lock().unwrap().tasks_failed += 1;
                }
                inner.metrics.lock().unwrap().failed_tasks += 1;
                tracing::error!(worker_id = %worker_id, task_id = %job.task_id, error = %err, "task failed");
                let cb = inner.callbacks.lock().unwrap().on_task_failed.clone();
                if let Some(cb) = cb {
                    cb(worker_id, job.task_id.clone(), err.to_string()).await;
                }
            }
        }

        inner.task_assignments.lock().unwrap().remove(&job.task_id);

        let recycle = {
            let workers = inner.workers.lock().unwrap();
            match workers.get(&worker_id) {
                Some(handle) => {
                    let mut state = handle.state.lock().unwrap();
                    state.current_task_id = None;
                    state.status = WorkerStatus::Idle;
                    state.last_heartbeat = Utc::now();
                    refresh_telemetry(&inner, &mut state);
                    state.tasks_completed + state.tasks_failed >= inner.max_tasks_per_worker
                }
                None => false,
            }
        };

        if recycle {
            let name = inner
                .workers
                .lock()
                .unwrap()
                .get(&worker_id)
                .map(|h| h.state.lock().unwrap().name.clone());
            tracing::info!(worker_id = %worker_id, "worker max tasks reached, restarting");
            stop_worker(&inner, worker_id).await;
            if let Some(name) = name {
                create_worker(&inner, format!("{name}-restarted")).await;
            }
            break;
        }
    }
}

async fn supervisor_loop(inner: Arc<Inner>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(SUPERVISOR_INTERVAL_SECS));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if !inner.running.load(AtomicOrdering::SeqCst) {
            break;
        }

        let snapshot: Vec<(Uuid, Worker)> = {
            let workers = inner.workers.lock().unwrap();
            workers
                .iter()
                .map(|(id, h)| (*id, h.state.lock().unwrap().clone()))
                .collect()
        };

        for (id, worker) in snapshot {
            if !worker.is_healthy() {
                tracing::warn!(worker_id = %id, name = %worker.name, status = ?worker.status, "worker unhealthy, restarting");
                stop_worker(&inner, id).await;
                create_worker(&inner, format!("{}-health", worker.name)).await;
            }
        }
    }
}

async fn scaling_loop(inner: Arc<Inner>) {
    loop {
        tokio::time::sleep(inner.scale_interval).await;
        if !inner.running.load(AtomicOrdering::SeqCst) {
            break;
        }

        let usage = queue_usage(&inner);
        let current_count = inner.workers.lock().unwrap().len();

        if usage > inner.scale_up_threshold && current_count < inner.max_workers {
            let new_workers = scale_up_count(usage, inner.max_workers, current_count);
            for i in 0..new_workers {
                create_worker(&inner, format!("worker-scaleup-{}", i + 1)).await;
            }
            tracing::info!(added = new_workers, total = current_count + new_workers, "scaled up workers");
        } else if usage < inner.scale_down_threshold && current_count > inner.min_workers {
            let to_remove = scale_down_count(usage, inner.scale_down_threshold, inner.min_workers, current_count);
            let mut removed = 0;
            for _ in 0..to_remove {
                match find_idle_worker(&inner) {
                    Some(id) => {
                        stop_worker(&inner, id).await;
                        removed += 1;
                    }
                    None => break,
                }
            }
            tracing::info!(removed, total = current_count - removed, "scaled down workers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn processor_ok() -> TaskProcessor {
        Arc::new(|_id, _data| Box::pin(async { Ok(()) }))
    }

    fn processor_always_fails() -> TaskProcessor {
        Arc::new(|_id, _data| Box::pin(async { Err(gitforge_core::AppError::InvalidArgument("boom".into())) }))
    }

    #[tokio::test]
    async fn start_brings_up_min_workers() {
        let pool = WorkerPool::new(2, 4, 100, 0.8, 0.3, 30, 16);
        pool.start().await;
        assert_eq!(pool.get_worker_count(), 2);
        pool.stop(false).await;
    }

    #[tokio::test]
    async fn submit_task_runs_processor_and_updates_metrics() {
        let pool = WorkerPool::new(1, 1, 100, 0.8, 0.3, 30, 16);
        let completed = Arc::new(AtomicU32::new(0));
        let completed2 = completed.clone();
        pool.set_task_processor(processor_ok());
        pool.set_callbacks(
            None,
            None,
            None,
            None,
            Some(Arc::new(move |_wid, _tid, _err| {
                completed2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Box::pin(async {})
            })),
            None,
        );
        pool.start().await;
        assert!(pool.submit_task("task-1".to_string(), serde_json::Value::Null, 0));

        for _ in 0..50 {
            if pool.get_metrics().completed_tasks == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pool.stop(false).await;
        assert_eq!(pool.get_metrics().completed_tasks, 1);
        assert_eq!(completed.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_task_increments_failed_metrics() {
        let pool = WorkerPool::new(1, 1, 100, 0.8, 0.3, 30, 16);
        pool.set_task_processor(processor_always_fails());
        pool.start().await;
        assert!(pool.submit_task("task-1".to_string(), serde_json::Value::Null, 0));

        for _ in 0..50 {
            if pool.get_metrics().failed_tasks == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pool.stop(false).await;
        assert_eq!(pool.get_metrics().failed_tasks, 1);
    }

    #[tokio::test]
    async fn submit_task_rejected_when_channel_full() {
        let pool = WorkerPool::new(0, 0, 100, 0.8, 0.3, 30, 1);
        // No workers, no processor draining the channel: first submit fills
        // the one slot, second must be rejected.
        *pool.inner.job_tx.lock().unwrap() = Some({
            let (tx, rx) = mpsc::channel(1);
            *pool.inner.job_rx.lock().unwrap() = Some(Arc::new(AsyncMutex::new(rx)));
            tx
        });
        pool.inner.running.store(true, AtomicOrdering::SeqCst);
        assert!(pool.submit_task("t1".to_string(), serde_json::Value::Null, 0));
        assert!(!pool.submit_task("t2".to_string(), serde_json::Value::Null, 0));
    }

    #[tokio::test]
    async fn force_scale_respects_bounds() {
        let pool = WorkerPool::new(1, 3, 100, 0.8, 0.3, 30, 16);
        pool.start().await;
        let count = pool.force_scale(10).await;
        assert_eq!(count, 3);
        pool.stop(false).await;
    }

    #[tokio::test]
    async fn cleanup_stale_tasks_reaps_timed_out_assignment() {
        let pool = WorkerPool::new(1, 1, 100, 0.8, 0.3, 30, 16);
        pool.start().await;
        let worker_id = pool.get_workers()[0].id;

        inject_stale_assignment(&pool, worker_id, "stuck-task");

        let cleaned = pool.cleanup_stale_tasks(0);
        assert_eq!(cleaned, 1);
        assert_eq!(pool.get_metrics().failed_tasks, 1);
        pool.stop(false).await;
    }

    fn inject_stale_assignment(pool: &WorkerPool, worker_id: Uuid, task_id: &str) {
        pool.inner
            .task_assignments
            .lock()
            .unwrap()
            .insert(task_id.to_string(), worker_id);
        let handle = pool.inner.workers.lock().unwrap().get(&worker_id).cloned().unwrap();
        let mut state = handle.state.lock().unwrap();
        state.status = WorkerStatus::Busy;
        state.current_task_id = Some(task_id.to_string());
        state.last_heartbeat = Utc::now() - chrono::Duration::seconds(5);
    }
}

#[cfg(test)]
mod scaler_proptests {
    use super::{scale_down_count, scale_up_count};
    use proptest::prelude::*;

    proptest! {
        /// Scaling up never exceeds the headroom under `max_workers`.
        #[test]
        fn scale_up_count_respects_headroom(
            usage in 0.0f64..10.0,
            max_workers in 1usize..64,
            current_count in 0usize..64,
        ) {
            let current_count = current_count.min(max_workers);
            let added = scale_up_count(usage, max_workers, current_count);
            prop_assert!(current_count + added <= max_workers);
        }

        /// Higher usage never requests fewer additional workers, as long as
        /// both readings have the same headroom available.
        #[test]
        fn scale_up_count_is_monotonic_in_usage(
            low in 0.0f64..5.0,
            delta in 0.0f64..5.0,
            max_workers in 32usize..64,
        ) {
            let high = low + delta;
            let added_low = scale_up_count(low, max_workers, 0);
            let added_high = scale_up_count(high, max_workers, 0);
            prop_assert!(added_high >= added_low);
        }

        /// Scaling down never removes more workers than the headroom above
        /// `min_workers`.
        #[test]
        fn scale_down_count_respects_headroom(
            usage in 0.0f64..1.0,
            threshold in 0.0f64..1.0,
            min_workers in 0usize..32,
            current_count in 0usize..64,
        ) {
            let current_count = current_count.max(min_workers);
            let removed = scale_down_count(usage, threshold, min_workers, current_count);
            prop_assert!(current_count - removed >= min_workers);
        }

        /// The further usage falls below the threshold, the more workers are
        /// requested for removal, given equal headroom.
        #[test]
        fn scale_down_count_is_monotonic_in_gap(
            threshold in 0.2f64..1.0,
            low_usage in 0.0f64..0.2,
            delta in 0.0f64..0.2,
        ) {
            let high_usage = (low_usage + delta).min(threshold);
            let removed_far = scale_down_count(low_usage, threshold, 0, 64);
            let removed_near = scale_down_count(high_usage, threshold, 0, 64);
            prop_assert!(removed_far >= removed_near);
        }
    }
}
