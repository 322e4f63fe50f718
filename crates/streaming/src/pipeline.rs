use std::collections::BTreeMap;

use foundation::time::Time;
use runtime::budget::FrameBudget;
use runtime::work_queue::{WorkId, WorkQueueFull};

use crate::candidate::AssetKey;
use crate::queue::FetchQueue;
use crate::request::{AssetClass, FetchCommand, FetchId, FetchRequest};

#[derive(Debug, Clone)]
struct InFlight {
    request: FetchRequest,
    started_at: Time,
}

/// How a cancelled fetch was found.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cancelled {
    /// Still queued; the host never saw it.
    Dequeued,
    /// Already handed to the host, which should abort it.
    InFlight,
    Unknown,
}

/// A completion that matched a tracked fetch.
#[derive(Debug, Clone)]
pub struct Completed {
    pub request: FetchRequest,
    pub elapsed_s: f64,
}

/// Tracks fetches from submission until the host reports back.
///
/// The pipeline does no I/O. Pipelines submit, the host drains
/// [`FetchCommand`]s each frame, and completions are matched by [`FetchId`].
#[derive(Debug)]
pub struct FetchPipeline {
    queue: FetchQueue,
    queued: BTreeMap<FetchId, WorkId>,
    in_flight: BTreeMap<FetchId, InFlight>,
    aborts: Vec<FetchId>,
    next_id: u64,
    timeout_s: Option<f64>,
}

impl FetchPipeline {
    pub fn new(max_pending: usize) -> Self {
        Self {
            queue: FetchQueue::new(max_pending),
            queued: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            aborts: Vec::new(),
            next_id: 1,
            timeout_s: None,
        }
    }

    /// In-flight fetches older than `timeout_ms` are expired by [`Self::expire`].
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_s = (timeout_ms > 0).then(|| Time::from_millis(timeout_ms).seconds());
        self
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty() && self.aborts.is_empty()
    }

    pub fn is_pending(&self, id: FetchId) -> bool {
        self.queued.contains_key(&id) || self.in_flight.contains_key(&id)
    }

    pub fn submit(
        &mut self,
        class: AssetClass,
        uri: impl Into<String>,
        key: AssetKey,
    ) -> Result<FetchId, WorkQueueFull> {
        let id = FetchId(self.next_id);
        let request = FetchRequest {
            id,
            uri: uri.into(),
            key,
            class,
        };
        let work_id = self.queue.try_submit(request)?;
        self.next_id += 1;
        self.queued.insert(id, work_id);
        Ok(id)
    }

    /// Forgets `id`. In-flight fetches are also queued for an abort command.
    pub fn cancel(&mut self, id: FetchId) -> Cancelled {
        if let Some(work_id) = self.queued.remove(&id) {
            let _ = self.queue.cancel(work_id);
            return Cancelled::Dequeued;
        }
        if self.in_flight.remove(&id).is_some() {
            self.aborts.push(id);
            return Cancelled::InFlight;
        }
        Cancelled::Unknown
    }

    /// Pending aborts first, then as many queued fetches as `budget` allows.
    pub fn take_commands(&mut self, budget: &mut FrameBudget, now: Time) -> Vec<FetchCommand> {
        let mut commands: Vec<FetchCommand> =
            self.aborts.drain(..).map(FetchCommand::Abort).collect();
        while let Some(request) = self.queue.pop_next_with_budget(budget) {
            self.queued.remove(&request.id);
            self.in_flight.insert(
                request.id,
                InFlight {
                    request: request.clone(),
                    started_at: now,
                },
            );
            commands.push(FetchCommand::Start(request));
        }
        commands
    }

    /// Matches a host completion. `None` means the fetch is stale or unknown.
    pub fn complete(&mut self, id: FetchId, now: Time) -> Option<Completed> {
        let flight = self.in_flight.remove(&id)?;
        Some(Completed {
            elapsed_s: now.since(flight.started_at),
            request: flight.request,
        })
    }

    /// Removes in-flight fetches that outlived the timeout and asks the host to
    /// abort them.
    pub fn expire(&mut self, now: Time) -> Vec<FetchRequest> {
        let Some(timeout_s) = self.timeout_s else {
            return Vec::new();
        };
        let expired: Vec<FetchId> = self
            .in_flight
            .iter()
            .filter(|(_, f)| now.since(f.started_at) >= timeout_s)
            .map(|(id, _)| *id)
            .collect();

        let mut out = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(flight) = self.in_flight.remove(&id) {
                self.aborts.push(id);
                out.push(flight.request);
            }
        }
        out
    }
}
