//! Priority task queue: a binary heap keyed by
//! `(-priority, created_at)`, drained by a single scheduler loop under a
//! `max_concurrent` semaphore, with retry and queue-wide callbacks.

mod callbacks;
mod entry;
mod metrics;

pub use callbacks::{Callbacks, OnComplete, OnError, OnQueueFull, UnitFuture};
pub use entry::{BoxFuture, TaskOutput, Work};
pub use metrics::QueueMetrics;

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gitforge_core::{AppError, Priority, TaskRecord};
use tokio::sync::{mpsc, Notify, Semaphore};
use uuid::Uuid;

use callbacks::Callbacks as QueueCallbacks;
use entry::Entry;
use metrics::MetricsInner;

struct Inner {
    heap: Mutex<BinaryHeap<Entry>>,
    max_size: usize,
    max_concurrent: usize,
    max_retries: u32,
    semaphore: Arc<Semaphore>,
    metrics: Mutex<MetricsInner>,
    active_count: AtomicUsize,
    running: AtomicBool,
    callbacks: Mutex<QueueCallbacks>,
    notify: Notify,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    scheduler: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// An in-memory priority task queue. Cheap to clone (wraps an `Arc`), so
/// handles can be shared across callers that submit concurrently.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl TaskQueue {
    pub fn new(max_size: usize, max_concurrent: usize, max_retries: u32) -> Self {
        let inner = Arc::new(Inner {
            heap: Mutex::new(BinaryHeap::new()),
            max_size,
            max_concurrent,
            max_retries,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            metrics: Mutex::new(MetricsInner::default()),
            active_count: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            callbacks: Mutex::new(QueueCallbacks::default()),
            notify: Notify::new(),
            stop_tx: Mutex::new(None),
            scheduler: Mutex::new(None),
        });
        Self { inner }
    }

    pub fn set_callbacks(
        &self,
        on_complete: Option<OnComplete>,
        on_error: Option<OnError>,
        on_queue_full: Option<OnQueueFull>,
    ) {
        *self.inner.callbacks.lock().unwrap() = QueueCallbacks {
            on_complete,
            on_error,
            on_queue_full,
        };
    }

    /// Idempotent: a second call while already running is a no-op.
    pub fn start(&self) {
        if self.inner.running.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        tracing::info!(
            max_size = self.inner.max_size,
            max_concurrent = self.inner.max_concurrent,
            "starting task queue"
        );
        let (stop_tx, stop_rx) = mpsc::channel(1);
        *self.inner.stop_tx.lock().unwrap() = Some(stop_tx);
        let inner = self.inner.clone();
        let handle = tokio::spawn(scheduler_loop(inner, stop_rx));
        *self.inner.scheduler.lock().unwrap() = Some(handle);
    }

    /// Idempotent: cancels the scheduler loop, then waits for every
    /// in-flight computation to finish before returning.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, AtomicOrdering::SeqCst) {
            return;
        }
        tracing::info!("stopping task queue");

        if let Some(tx) = self.inner.stop_tx.lock().unwrap().take() {
            let _ = tx.send(()).await;
        }
        let handle = self.inner.scheduler.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        // Acquiring every permit blocks until all in-flight workers release theirs.
        if let Ok(permit) = self
            .inner
            .semaphore
            .clone()
            .acquire_many_owned(self.inner.max_concurrent as u32)
            .await
        {
            drop(permit);
        }
        tracing::info!("task queue stopped");
    }

    pub async fn submit(
        &self,
        work: Work,
        priority: Priority,
        params: serde_json::Value,
        max_retries: Option<u32>,
    ) -> Result<Uuid, AppError> {
        let current_size = self.inner.heap.lock().unwrap().len();
        if self.inner.max_size != 0 && current_size >= self.inner.max_size {
            let id = Uuid::new_v4();
            tracing::warn!(task_id = %id, "queue full, task rejected");
            let cb = self.inner.callbacks.lock().unwrap().on_queue_full.clone();
            if let Some(cb) = cb {
                cb(id, params.clone()).await;
            }
            return Err(AppError::TransientQueueFull);
        }

        let record = TaskRecord::new(priority, max_retries.unwrap_or(self.inner.max_retries));
        let id = record.id;
        let entry = Entry { record, params, work };
        self.inner.heap.lock().unwrap().push(entry);
        self.inner.metrics.lock().unwrap().submitted += 1;
        self.inner.notify.notify_one();
        tracing::debug!(task_id = %id, ?priority, "task submitted");
        Ok(id)
    }

    /// Submits each item in order, stopping at the first `QueueFull` and
    /// returning the ids accepted so far.
    pub async fn submit_batch(
        &self,
        items: Vec<(Work, Priority, serde_json::Value)>,
    ) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(items.len());
        for (work, priority, params) in items {
            match self.submit(work, priority, params, None).await {
                Ok(id) => ids.push(id),
                Err(_) => break,
            }
        }
        ids
    }

    pub fn clear(&self) -> usize {
        let mut heap = self.inner.heap.lock().unwrap();
        let cleared = heap.len();
        heap.clear();
        tracing::info!(count = cleared, "queue cleared");
        cleared
    }

    pub async fn wait_for_completion(&self, timeout: Option<Duration>) -> bool {
        let start = Instant::now();
        loop {
            let empty = self.inner.heap.lock().unwrap().is_empty();
            let active = self.inner.active_count.load(AtomicOrdering::SeqCst);
            if empty && active == 0 {
                return true;
            }
            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return false;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    pub fn get_queue_size(&self) -> usize {
        self.inner.heap.lock().unwrap().len()
    }

    pub fn get_active_count(&self) -> usize {
        self.inner.active_count.load(AtomicOrdering::SeqCst)
    }

    pub fn get_metrics(&self) -> QueueMetrics {
        let m = self.inner.metrics.lock().unwrap();
        let queue_size = self.get_queue_size();
        let active_count = self.get_active_count();
        let avg = if m.completed > 0 {
            m.total_processing_time / m.completed as f64
        } else {
            0.0
        };
        QueueMetrics {
            submitted: m.submitted,
            completed: m.completed,
            failed: m.failed,
            retried: m.retried,
            cancelled: m.cancelled,
            avg_processing_time_seconds: avg,
            queue_size,
            active_count,
            max_concurrent: self.inner.max_concurrent,
            available_slots: self.inner.max_concurrent.saturating_sub(active_count),
        }
    }
}

async fn scheduler_loop(inner: Arc<Inner>, mut stop_rx: mpsc::Receiver<()>) {
    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = inner.notify.notified() => {}
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }

        loop {
            let entry = inner.heap.lock().unwrap().pop();
            let Some(entry) = entry else { break };

            if !inner.running.load(AtomicOrdering::SeqCst) {
                inner.heap.lock().unwrap().push(entry);
                break;
            }

            let permit = match inner.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    inner.heap.lock().unwrap().push(entry);
                    break;
                }
            };

            inner.active_count.fetch_add(1, AtomicOrdering::SeqCst);
            let inner2 = inner.clone();
            tokio::spawn(async move {
                let _permit = permit;
                run_entry(inner2, entry).await;
            });
        }
    }
}

async fn run_entry(inner: Arc<Inner>, entry: Entry) {
    let Entry { mut record, params, work } = entry;
    let id = record.id;
    let start = Instant::now();
    let result = (work)(params.clone()).await;

    match result {
        Ok(value) => {
            let elapsed = start.elapsed().as_secs_f64();
            {
                let mut m = inner.metrics.lock().unwrap();
                m.completed += 1;
                m.total_processing_time += elapsed;
            }
            tracing::debug!(task_id = %id, processing_time = elapsed, "task completed");
            let cb = inner.callbacks.lock().unwrap().on_complete.clone();
            if let Some(cb) = cb {
                cb(id, value).await;
            }
        }
        Err(AppError::Cancelled) => {
            inner.metrics.lock().unwrap().cancelled += 1;
            tracing::info!(task_id = %id, "task cancelled");
        }
        Err(err) => {
            if record.retries < record.max_retries {
                record.retries += 1;
                inner.metrics.lock().unwrap().retried += 1;
                tracing::warn!(
                    task_id = %id,
                    attempt = record.retries,
                    max_attempts = record.max_retries,
                    error = %err,
                    "task failed, retrying"
                );
                let over_capacity =
                    inner.max_size != 0 && inner.heap.lock().unwrap().len() >= inner.max_size;
                if over_capacity {
                    inner.metrics.lock().unwrap().failed += 1;
                    tracing::error!(task_id = %id, "task failed permanently, queue full on retry");
                } else {
                    inner.heap.lock().unwrap().push(Entry { record, params, work });
                    inner.notify.notify_one();
                }
            } else {
                inner.metrics.lock().unwrap().failed += 1;
                tracing::error!(task_id = %id, error = %err, "task failed permanently");
                let cb = inner.callbacks.lock().unwrap().on_error.clone();
                if let Some(cb) = cb {
                    cb(id, err.to_string()).await;
                }
            }
        }
    }

    inner.active_count.fetch_sub(1, AtomicOrdering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn work_ok() -> Work {
        Arc::new(|_| Box::pin(async { Ok(serde_json::json!({"ok": true})) }))
    }

    fn work_always_fails() -> Work {
        Arc::new(|_| Box::pin(async { Err(AppError::InvalidArgument("boom".into())) }))
    }

    #[tokio::test]
    async fn submit_rejects_at_capacity() {
        let queue = TaskQueue::new(1, 1, 0);
        queue
            .submit(work_ok(), Priority::Normal, serde_json::Value::Null, None)
            .await
            .unwrap();
        let result = queue
            .submit(work_ok(), Priority::Normal, serde_json::Value::Null, None)
            .await;
        assert!(matches!(result, Err(AppError::TransientQueueFull)));
    }

    #[tokio::test]
    async fn submit_batch_stops_at_first_queue_full() {
        let queue = TaskQueue::new(2, 4, 0);
        let items = vec![
            (work_ok(), Priority::Normal, serde_json::Value::Null),
            (work_ok(), Priority::Normal, serde_json::Value::Null),
            (work_ok(), Priority::Normal, serde_json::Value::Null),
        ];
        let ids = queue.submit_batch(items).await;
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_pending_tasks_and_reports_count() {
        let queue = TaskQueue::new(0, 1, 0);
        queue
            .submit(work_ok(), Priority::Normal, serde_json::Value::Null, None)
            .await
            .unwrap();
        queue
            .submit(work_ok(), Priority::Normal, serde_json::Value::Null, None)
            .await
            .unwrap();
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.get_queue_size(), 0);
    }

    #[tokio::test]
    async fn completed_task_updates_metrics_and_callback() {
        let queue = TaskQueue::new(0, 2, 0);
        let completed = Arc::new(AtomicU32::new(0));
        let completed2 = completed.clone();
        queue.set_callbacks(
            Some(Arc::new(move |_id, _value| {
                completed2.fetch_add(1, Ordering::SeqCst);
                Box::pin(async {})
            })),
            None,
            None,
        );
        queue.start();
        queue
            .submit(work_ok(), Priority::High, serde_json::Value::Null, None)
            .await
            .unwrap();
        assert!(queue.wait_for_completion(Some(Duration::from_secs(2))).await);
        queue.stop().await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(queue.get_metrics().completed, 1);
    }

    #[tokio::test]
    async fn failing_task_retries_then_gives_up() {
        let queue = TaskQueue::new(0, 2, 1);
        queue.start();
        queue
            .submit(work_always_fails(), Priority::Normal, serde_json::Value::Null, None)
            .await
            .unwrap();
        assert!(queue.wait_for_completion(Some(Duration::from_secs(3))).await);
        queue.stop().await;
        let metrics = queue.get_metrics();
        assert_eq!(metrics.retried, 1);
        assert_eq!(metrics.failed, 1);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let queue = TaskQueue::new(0, 1, 0);
        queue.start();
        queue.start();
        queue.stop().await;
        queue.stop().await;
    }
}
