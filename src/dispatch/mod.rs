//! Concurrent, rate-limited execution of request descriptors.
//!
//! - [`task`] - one admitted request from transport call to terminal state
//! - [`report`] - per-batch tallies and collected descriptors
//!
//! The scheduling loop admits descriptors in index order through the network
//! limiter. A stop-predicate hit halts admission but lets in-flight requests
//! finish; a transport failure halts admission and cancels in-flight requests.
//! Storage writes run on their own limiter and never affect either signal.

mod report;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use report::DispatchReport;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::limiter::RateLimiter;
use crate::request::{AlwaysStore, NeverStop, RequestDescriptor, StopPredicate, StoragePredicate};
use crate::storage::StoragePipeline;
use crate::transport::Transport;
use crate::types::{Event, RequestState};

use task::{TaskContext, run_request};

/// Batch-level predicates applied to every response
#[derive(Clone)]
pub struct DispatchHooks {
    /// Ends the sweep when it returns true (default: never)
    pub stop_when: Arc<dyn StopPredicate>,
    /// Filters which completed requests are stored (default: all)
    pub store_when: Arc<dyn StoragePredicate>,
}

impl Default for DispatchHooks {
    fn default() -> Self {
        Self {
            stop_when: Arc::new(NeverStop),
            store_when: Arc::new(AlwaysStore),
        }
    }
}

impl DispatchHooks {
    /// Replace the stop predicate
    pub fn stop_when(mut self, predicate: impl StopPredicate + 'static) -> Self {
        self.stop_when = Arc::new(predicate);
        self
    }

    /// Replace the storage predicate
    pub fn store_when(mut self, predicate: impl StoragePredicate + 'static) -> Self {
        self.store_when = Arc::new(predicate);
        self
    }
}

impl std::fmt::Debug for DispatchHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHooks").finish_non_exhaustive()
    }
}

/// Executes batches of descriptors under the network and storage limiters
///
/// The network limiter is shared by every batch this dispatcher runs; each
/// batch gets its own storage pipeline.
pub struct Dispatcher {
    config: DispatchConfig,
    transport: Arc<dyn Transport>,
    network: RateLimiter,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Dispatcher {
    /// Create a dispatcher over the given transport
    pub fn new(config: DispatchConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _rx) = broadcast::channel(config.event_buffer.max(1));
        Self {
            network: RateLimiter::new(config.network),
            config,
            transport,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Receive [`Event`]s for every batch dispatched after subscribing
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Cancel every running and future batch of this dispatcher
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Active configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Network slots free right now
    pub fn available_slots(&self) -> usize {
        self.network.available()
    }

    /// Run one batch to completion
    ///
    /// Descriptors are admitted in order; completion order is unspecified.
    /// Per-request outcomes are recorded on the descriptors (returned only
    /// when `collect` is set) and tallied in the report.
    ///
    /// # Errors
    ///
    /// Only [`Error::Task`], when a request task panicked (e.g. inside a
    /// user hook). Transport and storage failures are never returned here.
    pub async fn dispatch(
        &self,
        descriptors: Vec<RequestDescriptor>,
        hooks: DispatchHooks,
    ) -> Result<DispatchReport> {
        let total = descriptors.len();
        let batch = self.cancel_token.child_token();
        let stop = CancellationToken::new();
        let (storage, storage_handle) = StoragePipeline::new(
            self.config.storage,
            self.event_tx.clone(),
            self.config.verbose,
        );

        let ctx = Arc::new(TaskContext {
            transport: Arc::clone(&self.transport),
            stop_when: hooks.stop_when,
            store_when: hooks.store_when,
            storage,
            batch: batch.clone(),
            stop: stop.clone(),
            event_tx: self.event_tx.clone(),
            verbose: self.config.verbose,
        });

        progress!(
            self.config.verbose,
            requests = total,
            limit = self.network.limit(),
            rate_secs = self.network.rate().as_secs_f64(),
            "Dispatching batch"
        );

        let mut finished: Vec<RequestDescriptor> = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();
        let mut queue = descriptors.into_iter();

        for mut descriptor in queue.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = batch.cancelled() => None,
                _ = stop.cancelled() => None,
                permit = self.network.acquire() => permit,
            };

            let Some(permit) = permit else {
                // Not admitted: handled with the rest of the queue below
                finished.push(descriptor);
                break;
            };

            descriptor.set_state(RequestState::InFlight);
            tracing::trace!(index = descriptor.index(), url = %descriptor.url(), "Request admitted");
            tasks.spawn(run_request(descriptor, permit, Arc::clone(&ctx)));
        }
        finished.extend(queue);

        // Everything still pending was never admitted
        let cancelled = batch.is_cancelled();
        for descriptor in finished.iter_mut() {
            if cancelled {
                descriptor.set_state(RequestState::Cancelled);
                let _ = self.event_tx.send(Event::RequestCancelled {
                    index: descriptor.index(),
                });
            }
        }
        if !finished.is_empty() {
            tracing::debug!(
                skipped = finished.len(),
                reason = if cancelled { "cancelled" } else { "stopped" },
                "Requests left unscheduled"
            );
        }

        let mut task_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(descriptor) => finished.push(descriptor),
                Err(e) => {
                    tracing::error!(error = %e, "Request task panicked");
                    batch.cancel();
                    task_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        drop(ctx);

        if let Some(message) = task_error {
            return Err(Error::Task(message));
        }

        finished.sort_by_key(RequestDescriptor::index);
        let mut report = DispatchReport::tally(&finished);

        let _ = self.event_tx.send(Event::BatchFinished {
            completed: report.completed,
            failed: report.failed,
        });
        tracing::info!(
            total = report.total,
            completed = report.completed,
            stopped = report.stopped,
            failed = report.failed,
            cancelled = report.cancelled,
            pending = report.pending,
            "Batch finished"
        );

        if self.config.collect {
            report.descriptors = finished;
        }

        if self.config.wait_for_storage {
            report.storage = storage_handle.wait().await;
        } else {
            report.set_storage_handle(storage_handle);
        }

        Ok(report)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("network", &self.network)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}
