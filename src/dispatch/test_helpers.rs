//! Scripted transport and descriptor builders for dispatcher tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{DispatchConfig, RateLimit};
use crate::error::{StorageError, TransportError};
use crate::request::{RequestDescriptor, RequestFactory, RequestParts, ResponseRecord, UrlAxis};
use crate::storage::Storage;
use crate::transport::Transport;

/// What the scripted transport does for a URL
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Respond with this status after the delay
    Respond(u16, Duration),
    /// Fail after the delay
    Fail(Duration),
    /// Never respond (until cancelled)
    Hang,
}

/// Transport that follows a per-URL script and tracks concurrency
pub(crate) struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    default: Script,
    active: AtomicUsize,
    pub(crate) peak: AtomicUsize,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new(default: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            default,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn script(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestParts) -> Result<ResponseRecord, TransportError> {
        self.calls.lock().unwrap().push(request.url.clone());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let script = self
            .scripts
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let result = match script {
            Script::Respond(status, delay) => {
                tokio::time::sleep(delay).await;
                Ok(ResponseRecord {
                    method: request.method,
                    url: request.url.clone(),
                    status,
                    text: format!("{{\"url\":\"{}\"}}", request.url),
                    bytes: format!("{{\"url\":\"{}\"}}", request.url).into_bytes(),
                    ..Default::default()
                })
            }
            Script::Fail(delay) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Connect {
                    url: request.url.clone(),
                    reason: "scripted failure".into(),
                })
            }
            Script::Hang => std::future::pending().await,
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Storage that fails for paths starting with `bad` and records the rest
#[derive(Default)]
pub(crate) struct RecordingStorage {
    pub(crate) written: Mutex<Vec<String>>,
    pub(crate) bodies: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if path.starts_with("bad") {
            return Err(StorageError::Rejected {
                path: path.to_string(),
                reason: "scripted failure".into(),
            });
        }
        self.written.lock().unwrap().push(path.to_string());
        self.bodies
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

/// `n` GET descriptors for `http://test/0` .. `http://test/{n-1}`
pub(crate) fn descriptors(n: usize) -> Vec<RequestDescriptor> {
    RequestFactory::new(UrlAxis::List(urls(n))).build().unwrap()
}

pub(crate) fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("http://test/{i}")).collect()
}

/// Fast limiters so tests run in milliseconds
pub(crate) fn config(limit: usize) -> DispatchConfig {
    DispatchConfig {
        network: RateLimit::new(0.001, limit).unwrap(),
        storage: RateLimit::new(0.001, 2).unwrap(),
        collect: true,
        ..Default::default()
    }
}

pub(crate) fn shared(transport: ScriptedTransport) -> Arc<ScriptedTransport> {
    Arc::new(transport)
}
