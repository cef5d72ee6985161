//! Worker registry
//!
//! The static pool of workers known to the coordinator and their busy flags.
//! The registry does no locking of its own; the dispatcher owns it behind a
//! single mutex together with the pending queue.

use tracing::debug;

/// Coordinator-side record of one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEntry {
    /// Worker endpoint (host:port)
    pub address: String,

    /// True while a dispatch to this worker is in flight
    pub busy: bool,
}

impl WorkerEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            busy: false,
        }
    }
}

/// Fixed set of workers, in registration order
///
/// Entries are never added or removed after construction, and a worker that
/// fails to answer is not quarantined.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: Vec<WorkerEntry>,
}

impl WorkerRegistry {
    /// Create a registry from worker endpoints, all initially free
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            workers: addresses.into_iter().map(WorkerEntry::new).collect(),
        }
    }

    /// First free worker in registration order
    ///
    /// Workers near the front of the list are favoured under load.
    pub fn select_free(&self) -> Option<usize> {
        let selected = self.workers.iter().position(|w| !w.busy);
        if let Some(index) = selected {
            debug!("Selected worker {}", self.workers[index].address);
        }
        selected
    }

    /// Idempotent
    pub fn mark_busy(&mut self, index: usize) {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.busy = true;
        }
    }

    /// Idempotent
    pub fn mark_free(&mut self, index: usize) {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.busy = false;
        }
    }

    pub fn get(&self, index: usize) -> Option<&WorkerEntry> {
        self.workers.get(index)
    }

    pub fn entries(&self) -> &[WorkerEntry] {
        &self.workers
    }

    /// All worker endpoints in registration order
    pub fn addresses(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.address.clone()).collect()
    }

    pub fn busy_count(&self) -> usize {
        self.workers.iter().filter(|w| w.busy).count()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
