use crate::budget::FrameBudget;

/// Ordered queue for work that has been requested but not started yet.
///
/// - Total ordering on `(priority, id)`; smaller priority values run first.
/// - Equal priorities are processed in insertion order.
/// - Cancelling hands the payload back and does not perturb the order of the
///   remaining items.
/// - Optional backpressure via a maximum pending length.
///
/// Vec-backed: the queue holds a handful of items at a time.

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkQueueFull {
    pub max_len: usize,
}

impl std::fmt::Display for WorkQueueFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "work queue is full ({} pending)", self.max_len)
    }
}

impl std::error::Error for WorkQueueFull {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    priority: i32,
    id: WorkId,
}

#[derive(Debug)]
struct Item<T> {
    key: Key,
    payload: T,
    cost_units: u32,
}

#[derive(Debug)]
pub struct WorkQueue<T> {
    next_id: u64,
    items: Vec<Item<T>>,
    max_len: Option<usize>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            items: Vec::new(),
            max_len: None,
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn try_push(
        &mut self,
        priority: i32,
        cost_units: u32,
        payload: T,
    ) -> Result<WorkId, WorkQueueFull> {
        if let Some(max_len) = self.max_len
            && self.items.len() >= max_len
        {
            return Err(WorkQueueFull { max_len });
        }

        let id = WorkId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.items.push(Item {
            key: Key { priority, id },
            payload,
            cost_units,
        });
        Ok(id)
    }

    /// Removes a queued item, returning its payload if it had not been popped.
    pub fn cancel(&mut self, id: WorkId) -> Option<T> {
        let idx = self.items.iter().position(|i| i.key.id == id)?;
        Some(self.items.remove(idx).payload)
    }

    fn best_index(&self) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .min_by_key(|(_, item)| item.key)
            .map(|(idx, _)| idx)
    }

    /// Pops the next item if the budget can cover its cost.
    ///
    /// If the head of the queue is too expensive this returns `None` without
    /// looking for a cheaper item, so priority order is never bypassed.
    pub fn pop_next_with_budget(&mut self, budget: &mut FrameBudget) -> Option<(WorkId, T)> {
        let idx = self.best_index()?;
        if !budget.try_consume(self.items[idx].cost_units) {
            return None;
        }
        let item = self.items.remove(idx);
        Some((item.key.id, item.payload))
    }
}
