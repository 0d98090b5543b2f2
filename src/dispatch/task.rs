//! Lifecycle of one admitted request.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::limiter::RatePermit;
use crate::request::{RequestDescriptor, StopPredicate, StoragePredicate};
use crate::storage::StoragePipeline;
use crate::transport::Transport;
use crate::types::{Event, RequestState};

/// Everything a request task shares with its batch
pub(super) struct TaskContext {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) stop_when: Arc<dyn StopPredicate>,
    pub(super) store_when: Arc<dyn StoragePredicate>,
    pub(super) storage: StoragePipeline,
    /// Cancelled on the first transport failure (or by the dispatcher)
    pub(super) batch: CancellationToken,
    /// Cancelled by the first stop-predicate hit
    pub(super) stop: CancellationToken,
    pub(super) event_tx: broadcast::Sender<Event>,
    pub(super) verbose: bool,
}

/// Run one in-flight request to a terminal state
///
/// The permit is held across the transport call and always released with
/// pacing, since the network limiter is shared by every batch of a
/// dispatcher. Only a completed request waits for the pacing delay itself.
pub(super) async fn run_request(
    mut descriptor: RequestDescriptor,
    permit: RatePermit,
    ctx: Arc<TaskContext>,
) -> RequestDescriptor {
    let index = descriptor.index();

    let outcome = tokio::select! {
        biased;
        _ = ctx.batch.cancelled() => None,
        result = ctx.transport.send(descriptor.parts()) => Some(result),
    };

    let response = match outcome {
        None => {
            permit.finish_in_background();
            tracing::debug!(index, url = %descriptor.url(), "Request cancelled in flight");
            descriptor.set_state(RequestState::Cancelled);
            let _ = ctx.event_tx.send(Event::RequestCancelled { index });
            return descriptor;
        }
        Some(Err(e)) => {
            // Cancel siblings before the admission loop can take another slot
            ctx.batch.cancel();
            permit.finish_in_background();
            tracing::warn!(index, url = %descriptor.url(), error = %e, "Request failed, cancelling batch");
            let _ = ctx.event_tx.send(Event::RequestFailed {
                index,
                url: descriptor.url().to_string(),
                error: e.to_string(),
            });
            descriptor.set_state(RequestState::Failed(e));
            return descriptor;
        }
        Some(Ok(response)) => response,
    };

    if ctx.stop_when.should_stop(&response) {
        ctx.stop.cancel();
        permit.finish_in_background();
        tracing::info!(
            index,
            url = %descriptor.url(),
            status = response.status,
            "Stop condition met, no further requests will be scheduled"
        );
        let _ = ctx.event_tx.send(Event::RequestStopped {
            index,
            url: descriptor.url().to_string(),
        });
        descriptor.attach_response(response);
        descriptor.set_state(RequestState::Stopped);
        return descriptor;
    }

    let response = descriptor.hook().apply(response);
    let status = response.status;
    descriptor.attach_response(response);
    descriptor.set_state(RequestState::Completed);

    progress!(ctx.verbose, index, url = %descriptor.url(), status, "Request completed");
    let _ = ctx.event_tx.send(Event::RequestCompleted {
        index,
        url: descriptor.url().to_string(),
        status,
    });

    submit_for_storage(&descriptor, &ctx);

    // A batch failure stops waiting; the slot still paces in the background
    let pacing = permit.finish_in_background();
    tokio::select! {
        _ = pacing => {}
        _ = ctx.batch.cancelled() => {}
    }

    descriptor
}

fn submit_for_storage(descriptor: &RequestDescriptor, ctx: &TaskContext) {
    let Some(storage) = descriptor.storage() else {
        return;
    };
    if !ctx.store_when.should_store(descriptor) {
        tracing::trace!(index = descriptor.index(), "Storage predicate declined response");
        return;
    }
    let Some(path) = descriptor.file_path() else {
        return;
    };
    // The hooked response, not the raw bytes off the wire
    let body = descriptor
        .response()
        .map(|r| r.text.as_bytes().to_vec())
        .unwrap_or_default();
    ctx.storage
        .submit(descriptor.index(), Arc::clone(storage), path, body);
}
