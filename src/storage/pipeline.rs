//! Detached storage writes under their own limiter.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::task::TaskTracker;

use crate::config::RateLimit;
use crate::error::StorageError;
use crate::limiter::RateLimiter;
use crate::types::Event;

use super::Storage;

/// Outcome of one storage write
#[derive(Debug)]
pub struct StorageReport {
    /// Descriptor the body came from
    pub index: usize,
    /// Destination path
    pub path: String,
    /// Write result
    pub result: Result<(), StorageError>,
}

impl StorageReport {
    /// True when the write succeeded
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs storage writes as detached tasks
///
/// Each submitted write waits for the storage limiter, writes, reports, and
/// then holds its slot for the storage rate. Writes are tracked separately
/// from network dispatch and are not cancelled when a request fails.
/// Clones submit into the same completion set.
#[derive(Clone, Debug)]
pub struct StoragePipeline {
    limiter: RateLimiter,
    tracker: TaskTracker,
    reports_tx: mpsc::UnboundedSender<StorageReport>,
    event_tx: broadcast::Sender<Event>,
    verbose: bool,
}

impl StoragePipeline {
    /// Pipeline with its own limiter, publishing `Saved`/`SaveFailed` events,
    /// plus the handle that awaits its writes
    pub fn new(
        limit: RateLimit,
        event_tx: broadcast::Sender<Event>,
        verbose: bool,
    ) -> (Self, StorageHandle) {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let tracker = TaskTracker::new();
        let handle = StorageHandle {
            tracker: tracker.clone(),
            reports_rx,
        };
        let pipeline = Self {
            limiter: RateLimiter::new(limit),
            tracker,
            reports_tx,
            event_tx,
            verbose,
        };
        (pipeline, handle)
    }

    /// Writes submitted and not yet finished
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Queue a write and return immediately
    pub fn submit(&self, index: usize, storage: Arc<dyn Storage>, path: String, body: Vec<u8>) {
        let limiter = self.limiter.clone();
        let reports_tx = self.reports_tx.clone();
        let event_tx = self.event_tx.clone();
        let verbose = self.verbose;

        self.tracker.spawn(async move {
            let Some(permit) = limiter.acquire().await else {
                return;
            };

            let result = storage.write(&path, &body).await;
            match &result {
                Ok(()) => {
                    progress!(verbose, index, path = %path, bytes = body.len(), "Saved response");
                    let _ = event_tx.send(Event::Saved {
                        index,
                        path: path.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!(index, path = %path, error = %e, "Failed to save response");
                    let _ = event_tx.send(Event::SaveFailed {
                        index,
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
            let _ = reports_tx.send(StorageReport {
                index,
                path,
                result,
            });

            permit.finish().await;
        });
    }
}

/// Completion set of a batch's storage writes
///
/// Dropping the handle leaves the writes running in the background.
#[derive(Debug)]
pub struct StorageHandle {
    tracker: TaskTracker,
    reports_rx: mpsc::UnboundedReceiver<StorageReport>,
}

impl StorageHandle {
    /// Writes still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every write submitted so far and collect the reports
    ///
    /// Call once submission is over; writes submitted while waiting may or
    /// may not be included.
    pub async fn wait(mut self) -> Vec<StorageReport> {
        self.tracker.close();
        self.tracker.wait().await;
        let mut reports = Vec::new();
        while let Ok(report) = self.reports_rx.try_recv() {
            reports.push(report);
        }
        reports
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if path.starts_with("bad") {
                return Err(StorageError::Rejected {
                    path: path.into(),
                    reason: "refused".into(),
                });
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn pipeline(limit: usize) -> (StoragePipeline, StorageHandle, broadcast::Receiver<Event>) {
        let (tx, rx) = broadcast::channel(64);
        let limit = RateLimit::new(0.001, limit).unwrap();
        let (pipeline, handle) = StoragePipeline::new(limit, tx, false);
        (pipeline, handle, rx)
    }

    #[tokio::test]
    async fn writes_are_reported_and_persisted() {
        let storage = Arc::new(MemoryStorage::default());
        let (pipeline, handle, mut events) = pipeline(2);

        pipeline.submit(0, storage.clone(), "a.json".into(), b"{}".to_vec());
        pipeline.submit(1, storage.clone(), "bad.json".into(), b"{}".to_vec());

        let mut reports = handle.wait().await;
        reports.sort_by_key(|r| r.index);

        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_ok());
        assert!(!reports[1].is_ok());
        assert!(storage.files.lock().unwrap().contains_key("a.json"));

        let mut saved = 0;
        let mut failed = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                Event::Saved { .. } => saved += 1,
                Event::SaveFailed { .. } => failed += 1,
                _ => {}
            }
        }
        assert_eq!((saved, failed), (1, 1));
    }

    #[tokio::test]
    async fn concurrent_writes_respect_storage_limit() {
        let storage = Arc::new(MemoryStorage::default());
        let (pipeline, handle, _events) = pipeline(2);

        for i in 0..8 {
            pipeline.submit(i, storage.clone(), format!("f{i}"), vec![0; 4]);
        }
        let reports = handle.wait().await;

        assert_eq!(reports.len(), 8);
        assert!(
            storage.peak.load(Ordering::SeqCst) <= 2,
            "peak concurrent writes exceeded the storage limit"
        );
    }

    #[tokio::test]
    async fn empty_pipeline_waits_for_nothing() {
        let (pipeline, handle, _events) = pipeline(1);
        assert_eq!(pipeline.pending(), 0);
        assert!(handle.wait().await.is_empty());
    }
}
