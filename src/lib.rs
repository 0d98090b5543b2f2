//! # reqsweep
//!
//! Expand compact request specifications into families of HTTP requests and
//! run them under independent network and storage rate limits.
//!
//! ## Design Philosophy
//!
//! reqsweep is designed to be:
//! - **Fail-fast** - Every malformed spec is rejected before the first request
//! - **Sensible defaults** - 5 concurrent requests, 5s pacing, 10s timeout
//! - **Library-first** - No CLI, no global logger; the caller installs a subscriber
//! - **Event-driven** - Consumers subscribe to dispatch events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use reqsweep::{DispatchConfig, RateLimit, RequestFactory, Sweep};
//! use reqsweep::expand::{FieldSpec, UrlTemplate};
//! use reqsweep::request::{FilePattern, ResponseRecord};
//! use reqsweep::storage::FileStorage;
//! use reqsweep::types::AxisValue;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = RequestFactory::new(
//!         UrlTemplate::new("https://api.example.com/{kind}/list")
//!             .arg("kind", AxisValue::list(["users", "teams"])),
//!     )
//!     .param(
//!         FieldSpec::builder("param")
//!             .fixed("page_size", 100)
//!             .varying("page", AxisValue::list(1..=20))
//!             .build()?,
//!     );
//!
//!     let config = DispatchConfig {
//!         network: RateLimit::new(0.5, 4)?,
//!         ..Default::default()
//!     };
//!
//!     let sweep = Sweep::with_reqwest(factory, config)?
//!         .storage(Arc::new(FileStorage::new("out")))
//!         .file_path(FilePattern::new("{page}.json"))
//!         .stop_when(|r: &ResponseRecord| r.status == 404);
//!
//!     // Subscribe to events
//!     let mut events = sweep.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = sweep.execute().await?;
//!     println!("{} completed, {} failed", report.completed, report.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

// Per-request progress lines: info when the caller asked for verbose output,
// debug otherwise.
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Auth providers and composition
pub mod auth;
/// Configuration types
pub mod config;
/// Concurrent, rate-limited dispatch
pub mod dispatch;
/// Error types
pub mod error;
/// Parameter-space expansion
pub mod expand;
/// Capacity and pacing limiter
pub mod limiter;
/// Declarative JSON plans
pub mod plan;
/// Request descriptors, hooks and the request factory
pub mod request;
/// Response persistence
pub mod storage;
/// End-to-end sweeps
pub mod sweep;
/// HTTP transport
pub mod transport;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use auth::{AuthProvider, NoAuth, StaticAuth, merge_auth};
pub use config::{Alignment, DispatchConfig, RateLimit};
pub use dispatch::{DispatchHooks, DispatchReport, Dispatcher};
pub use error::{Error, Result, SpecError, StorageError, TransportError};
pub use expand::{AuthSpec, FieldSpec, PathSpec, UrlTemplate, fill_forward_zip};
pub use plan::SweepPlan;
pub use request::{RequestDescriptor, RequestFactory, ResponseRecord, UrlAxis};
pub use storage::{FileStorage, Storage};
pub use sweep::Sweep;
pub use transport::{ReqwestTransport, Transport};
pub use types::{AxisValue, Credentials, Event, Method, RequestState, Scalar};

#[cfg(unix)]
pub(crate) async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
