use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use gitforge_core::AppError;

pub type ProcessorFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send>>;

/// The pool-wide work function, set once via `WorkerPool::set_task_processor`.
/// Called as `processor(task_id, task_data)` by whichever worker dequeues
/// the job.
pub type TaskProcessor = Arc<dyn Fn(String, serde_json::Value) -> ProcessorFuture + Send + Sync>;
