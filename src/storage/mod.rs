//! Response persistence.
//!
//! - [`Storage`] is the write contract a backend implements
//! - [`FileStorage`] writes under a local directory
//! - [`StoragePipeline`] runs writes as detached, rate-limited tasks whose
//!   outcome never feeds back into network dispatch

use async_trait::async_trait;

use crate::error::StorageError;

mod file;
mod pipeline;

pub use file::FileStorage;
pub use pipeline::{StorageHandle, StoragePipeline, StorageReport};

/// Destination for response bodies
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` to `path`, replacing any previous content
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;
}
