//! Outcome of one dispatched batch.

use crate::request::RequestDescriptor;
use crate::storage::{StorageHandle, StorageReport};
use crate::types::RequestState;

/// Per-state tallies plus, in collect mode, every descriptor
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Descriptors handed to the dispatcher
    pub total: usize,
    /// Descriptors that reached `Completed`
    pub completed: usize,
    /// Descriptors that matched the stop predicate
    pub stopped: usize,
    /// Descriptors whose transport call failed
    pub failed: usize,
    /// Descriptors abandoned after a failure or an explicit cancel
    pub cancelled: usize,
    /// Descriptors never admitted because the sweep stopped
    pub pending: usize,
    /// Every descriptor in index order (only when `collect` is set)
    pub descriptors: Vec<RequestDescriptor>,
    /// Storage outcomes (only when the dispatcher waited for storage)
    pub storage: Vec<StorageReport>,
    storage_handle: Option<StorageHandle>,
}

impl DispatchReport {
    pub(super) fn tally(descriptors: &[RequestDescriptor]) -> Self {
        let mut report = Self {
            total: descriptors.len(),
            ..Self::default()
        };
        for descriptor in descriptors {
            match descriptor.state() {
                RequestState::Completed => report.completed += 1,
                RequestState::Stopped => report.stopped += 1,
                RequestState::Failed(_) => report.failed += 1,
                RequestState::Cancelled => report.cancelled += 1,
                RequestState::Pending | RequestState::InFlight => report.pending += 1,
            }
        }
        report
    }

    pub(super) fn set_storage_handle(&mut self, handle: StorageHandle) {
        self.storage_handle = Some(handle);
    }

    /// True when a stop predicate ended the sweep
    pub fn was_stopped(&self) -> bool {
        self.stopped > 0
    }

    /// True when a transport failure cancelled the batch
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Collected descriptors that completed
    pub fn completed(&self) -> impl Iterator<Item = &RequestDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| matches!(d.state(), RequestState::Completed))
    }

    /// Collected descriptors that failed
    pub fn failures(&self) -> impl Iterator<Item = &RequestDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| matches!(d.state(), RequestState::Failed(_)))
    }

    /// Storage writes still running when the report was produced
    ///
    /// `None` when the dispatcher already waited for them.
    pub fn take_storage_handle(&mut self) -> Option<StorageHandle> {
        self.storage_handle.take()
    }

    /// Wait for outstanding storage writes and append their reports
    pub async fn wait_for_storage(&mut self) {
        if let Some(handle) = self.storage_handle.take() {
            self.storage.extend(handle.wait().await);
        }
    }
}
