use runtime::budget::FrameBudget;
use runtime::work_queue::{WorkId, WorkQueue, WorkQueueFull};

use crate::request::FetchRequest;

/// Fetches waiting for the host to start them.
///
/// Every fetch costs one budget unit; ordering comes from the asset class.
#[derive(Debug)]
pub struct FetchQueue {
    inner: WorkQueue<FetchRequest>,
}

impl FetchQueue {
    pub fn new(max_pending: usize) -> Self {
        Self {
            inner: WorkQueue::with_max_len(max_pending),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn try_submit(&mut self, request: FetchRequest) -> Result<WorkId, WorkQueueFull> {
        self.inner.try_push(request.class.priority(), 1, request)
    }

    pub fn cancel(&mut self, id: WorkId) -> Option<FetchRequest> {
        self.inner.cancel(id)
    }

    pub fn pop_next_with_budget(&mut self, budget: &mut FrameBudget) -> Option<FetchRequest> {
        let (_id, request) = self.inner.pop_next_with_budget(budget)?;
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::FetchQueue;
    use crate::candidate::AssetKey;
    use crate::request::{AssetClass, FetchId, FetchRequest};
    use runtime::budget::FrameBudget;

    fn request(id: u64, class: AssetClass) -> FetchRequest {
        FetchRequest {
            id: FetchId(id),
            uri: format!("https://a/{id}"),
            key: AssetKey::from_uri(&format!("https://a/{id}")),
            class,
        }
    }

    #[test]
    fn enforces_backpressure() {
        let mut q = FetchQueue::new(1);
        assert!(q.try_submit(request(1, AssetClass::Image)).is_ok());
        assert!(q.try_submit(request(2, AssetClass::Image)).is_err());
    }

    #[test]
    fn images_start_before_models() {
        let mut q = FetchQueue::new(10);
        q.try_submit(request(1, AssetClass::Model)).unwrap();
        q.try_submit(request(2, AssetClass::Image)).unwrap();

        let mut budget = FrameBudget::new(1);
        assert_eq!(q.pop_next_with_budget(&mut budget).map(|r| r.id), Some(FetchId(2)));
        assert!(q.pop_next_with_budget(&mut budget).is_none());
        assert_eq!(q.len(), 1);
    }
}
