use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use gitforge_core::{AppError, TaskRecord};

pub type TaskOutput = Result<serde_json::Value, AppError>;
pub type BoxFuture = Pin<Box<dyn Future<Output = TaskOutput> + Send>>;

/// The deferred computation a task wraps. `Fn`, not `FnOnce`: a retried task
/// re-invokes the same work with the same params.
pub type Work = Arc<dyn Fn(serde_json::Value) -> BoxFuture + Send + Sync>;

/// A heap entry: the introspectable record plus its deferred work. Ordered
/// by `(-priority, created_at)` so `BinaryHeap::pop` yields the
/// highest-priority, oldest-first task.
pub struct Entry {
    pub record: TaskRecord,
    pub params: serde_json::Value,
    pub work: Work,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.record.id == other.record.id
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record
            .priority
            .cmp(&other.record.priority)
            .then_with(|| other.record.created_at.cmp(&self.record.created_at))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitforge_core::Priority;
    use std::collections::BinaryHeap;

    fn entry(priority: Priority) -> Entry {
        Entry {
            record: TaskRecord::new(priority, 0),
            params: serde_json::Value::Null,
            work: Arc::new(|_| Box::pin(async { Ok(serde_json::Value::Null) })),
        }
    }

    #[test]
    fn higher_priority_pops_first() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(Priority::Low));
        heap.push(entry(Priority::Critical));
        heap.push(entry(Priority::Normal));
        assert_eq!(heap.pop().unwrap().record.priority, Priority::Critical);
        assert_eq!(heap.pop().unwrap().record.priority, Priority::Normal);
        assert_eq!(heap.pop().unwrap().record.priority, Priority::Low);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut heap = BinaryHeap::new();
        let first = entry(Priority::Normal);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = entry(Priority::Normal);
        let first_id = first.record.id;
        heap.push(second);
        heap.push(first);
        assert_eq!(heap.pop().unwrap().record.id, first_id);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use gitforge_core::Priority;
    use proptest::prelude::*;
    use std::collections::BinaryHeap;

    fn priority(raw: u8) -> Priority {
        match raw % 4 {
            0 => Priority::Low,
            1 => Priority::Normal,
            2 => Priority::High,
            _ => Priority::Critical,
        }
    }

    fn entry(p: Priority) -> Entry {
        Entry {
            record: TaskRecord::new(p, 0),
            params: serde_json::Value::Null,
            work: Arc::new(|_| Box::pin(async { Ok(serde_json::Value::Null) })),
        }
    }

    proptest! {
        /// For any push order, popping the heap always yields
        /// non-increasing priority: a lower-priority task never pops before
        /// a higher-priority one still queued.
        #[test]
        fn pop_order_is_never_priority_inverted(raw_priorities in prop::collection::vec(0u8..4, 0..64)) {
            let mut heap = BinaryHeap::new();
            for raw in raw_priorities {
                heap.push(entry(priority(raw)));
            }
            let mut last = None;
            while let Some(popped) = heap.pop() {
                if let Some(prev) = last {
                    prop_assert!(popped.record.priority <= prev);
                }
                last = Some(popped.record.priority);
            }
        }
    }
}
