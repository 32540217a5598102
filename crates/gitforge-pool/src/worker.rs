use std::sync::Mutex;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model::Worker;

/// Bookkeeping for one running worker: its mutable snapshot, the token used
/// to cancel its loop, and the join handle of the task that supervises it
/// for panics (see `lib.rs::create_worker`).
pub(crate) struct WorkerHandle {
    pub state: Mutex<Worker>,
    pub cancel: CancellationToken,
    pub join: Mutex<Option<JoinHandle<()>>>,
}
