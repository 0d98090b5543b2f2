//! Request descriptors and the factory that produces them.
//!
//! - [`descriptor`] - resolved requests and captured responses
//! - [`hooks`] - response hook, stop/storage predicates, file-path generators
//! - [`factory`] - axis alignment into descriptors

mod descriptor;
mod factory;
mod hooks;

pub use descriptor::{RequestDescriptor, RequestParts, ResponseRecord};
pub use factory::{RequestFactory, UrlAxis};
pub use hooks::{
    AlwaysStore, FilePathGenerator, FilePattern, IdentityHook, NeverStop, NoFilePath,
    ResponseHook, StopPredicate, StoragePredicate,
};
