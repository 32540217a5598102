/// A unit of work flowing through the pool's internal job channel. The
/// `priority` field is carried through for callers and metrics but does not
/// reorder the channel itself: workers drain it FIFO.
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub priority: i32,
    pub task_id: String,
    pub task_data: serde_json::Value,
}
