use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use uuid::Uuid;

pub type UnitFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type OnComplete = Arc<dyn Fn(Uuid, serde_json::Value) -> UnitFuture + Send + Sync>;
pub type OnError = Arc<dyn Fn(Uuid, String) -> UnitFuture + Send + Sync>;
pub type OnQueueFull = Arc<dyn Fn(Uuid, serde_json::Value) -> UnitFuture + Send + Sync>;

/// Queue-wide callbacks invoked from within the scheduler's execution
/// context. Any error inside one is logged and swallowed; accounting for
/// task outcomes never depends on a callback succeeding.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_complete: Option<OnComplete>,
    pub on_error: Option<OnError>,
    pub on_queue_full: Option<OnQueueFull>,
}
