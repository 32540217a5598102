use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use uuid::Uuid;

use crate::model::Worker;

pub type UnitFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub type OnWorkerStart = Arc<dyn Fn(Worker) -> UnitFuture + Send + Sync>;
pub type OnWorkerStop = Arc<dyn Fn(Worker) -> UnitFuture + Send + Sync>;
pub type OnWorkerFailure = Arc<dyn Fn(Uuid, String) -> UnitFuture + Send + Sync>;
pub type OnTaskAssigned = Arc<dyn Fn(Uuid, String) -> UnitFuture + Send + Sync>;
/// `(worker_id, task_id, error)`; `error` is `None` on success.
pub type OnTaskCompleted = Arc<dyn Fn(Uuid, String, Option<String>) -> UnitFuture + Send + Sync>;
pub type OnTaskFailed = Arc<dyn Fn(Uuid, String, String) -> UnitFuture + Send + Sync>;

/// Pool-wide lifecycle callbacks. Every callback runs inside the worker
/// loop's execution context; a callback error is logged and swallowed, it
/// never aborts task or worker accounting.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_worker_start: Option<OnWorkerStart>,
    pub on_worker_stop: Option<OnWorkerStop>,
    pub on_worker_failure: Option<OnWorkerFailure>,
    pub on_task_assigned: Option<OnTaskAssigned>,
    pub on_task_completed: Option<OnTaskCompleted>,
    pub on_task_failed: Option<OnTaskFailed>,
}
