//! Per-request callbacks: response mutation, stop and storage predicates,
//! and file-path generation.
//!
//! Each hook is a trait with a named identity default and a blanket impl for
//! plain closures, so callers can pass either.

use std::collections::BTreeMap;

use crate::expand::UrlTemplate;
use crate::types::AxisValue;

use super::descriptor::{RequestDescriptor, ResponseRecord};

/// Transforms a response before it is stored or returned
pub trait ResponseHook: Send + Sync {
    /// Return the (possibly modified) response
    fn apply(&self, response: ResponseRecord) -> ResponseRecord;
}

impl<F> ResponseHook for F
where
    F: Fn(ResponseRecord) -> ResponseRecord + Send + Sync,
{
    fn apply(&self, response: ResponseRecord) -> ResponseRecord {
        self(response)
    }
}

/// Returns responses unchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHook;

impl ResponseHook for IdentityHook {
    fn apply(&self, response: ResponseRecord) -> ResponseRecord {
        response
    }
}

/// Decides whether a response ends the sweep
pub trait StopPredicate: Send + Sync {
    /// True stops admission of further requests
    fn should_stop(&self, response: &ResponseRecord) -> bool;
}

impl<F> StopPredicate for F
where
    F: Fn(&ResponseRecord) -> bool + Send + Sync,
{
    fn should_stop(&self, response: &ResponseRecord) -> bool {
        self(response)
    }
}

/// Never stops
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverStop;

impl StopPredicate for NeverStop {
    fn should_stop(&self, _response: &ResponseRecord) -> bool {
        false
    }
}

/// Decides whether a completed request is persisted
pub trait StoragePredicate: Send + Sync {
    /// True submits the response to the storage pipeline
    fn should_store(&self, request: &RequestDescriptor) -> bool;
}

impl<F> StoragePredicate for F
where
    F: Fn(&RequestDescriptor) -> bool + Send + Sync,
{
    fn should_store(&self, request: &RequestDescriptor) -> bool {
        self(request)
    }
}

/// Stores everything that has a file path
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysStore;

impl StoragePredicate for AlwaysStore {
    fn should_store(&self, _request: &RequestDescriptor) -> bool {
        true
    }
}

/// Computes where a response body is written
///
/// `None` or an empty string means the response is not persisted.
pub trait FilePathGenerator: Send + Sync {
    /// Destination path, relative to the storage root
    fn generate(&self, request: &RequestDescriptor) -> Option<String>;
}

impl<F> FilePathGenerator for F
where
    F: Fn(&RequestDescriptor) -> Option<String> + Send + Sync,
{
    fn generate(&self, request: &RequestDescriptor) -> Option<String> {
        self(request)
    }
}

/// Never produces a path
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFilePath;

impl FilePathGenerator for NoFilePath {
    fn generate(&self, _request: &RequestDescriptor) -> Option<String> {
        None
    }
}

/// `{placeholder}` pattern filled from the request
///
/// Recognized names: `method`, `url`, `index`, `status` (once a response is
/// attached) and every query parameter name. A pattern that references an
/// unknown name yields no path.
///
/// # Examples
///
/// ```
/// use reqsweep::request::FilePattern;
///
/// let pattern = FilePattern::new("pages/{page}.json");
/// assert_eq!(pattern.pattern(), "pages/{page}.json");
/// ```
#[derive(Clone, Debug)]
pub struct FilePattern {
    pattern: String,
}

impl FilePattern {
    /// Pattern relative to the storage root
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The raw pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl FilePathGenerator for FilePattern {
    fn generate(&self, request: &RequestDescriptor) -> Option<String> {
        let mut args: BTreeMap<String, AxisValue> = request
            .parts()
            .params
            .iter()
            .map(|(k, v)| (k.clone(), AxisValue::Scalar(v.clone())))
            .collect();
        args.insert("method".into(), request.method().as_str().into());
        args.insert("url".into(), request.url().into());
        args.insert("index".into(), AxisValue::from(request.index().to_string()));
        if let Some(response) = request.response() {
            args.insert("status".into(), AxisValue::from(u32::from(response.status)));
        }

        match UrlTemplate::with_args(self.pattern.as_str(), args).expand() {
            Ok(mut paths) => paths.pop(),
            Err(e) => {
                tracing::warn!(
                    index = request.index(),
                    pattern = %self.pattern,
                    error = %e,
                    "File pattern could not be resolved"
                );
                None
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestParts;
    use crate::types::{Method, Scalar};
    use std::sync::Arc;

    fn descriptor(params: &[(&str, Scalar)]) -> RequestDescriptor {
        let parts = RequestParts {
            method: Method::Post,
            url: "http://h/items".into(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..Default::default()
        };
        RequestDescriptor::new(3, parts, Arc::new(NoFilePath), Arc::new(IdentityHook), None)
    }

    #[test]
    fn identity_hook_returns_response_unchanged() {
        let response = ResponseRecord {
            status: 204,
            text: "x".into(),
            ..Default::default()
        };
        let out = IdentityHook.apply(response);
        assert_eq!(out.status, 204);
        assert_eq!(out.text, "x");
    }

    #[test]
    fn closures_are_hooks() {
        let hook = |mut r: ResponseRecord| {
            r.text = r.text.to_uppercase();
            r
        };
        let out = hook.apply(ResponseRecord {
            text: "abc".into(),
            ..Default::default()
        });
        assert_eq!(out.text, "ABC");

        let stop = |r: &ResponseRecord| r.status == 404;
        assert!(stop.should_stop(&ResponseRecord {
            status: 404,
            ..Default::default()
        }));
        assert!(!NeverStop.should_stop(&ResponseRecord::default()));
    }

    #[test]
    fn pattern_uses_params_and_request_fields() {
        let d = descriptor(&[("page", Scalar::Int(7))]);
        let path = FilePattern::new("{method}/{index}/page-{page}.json").generate(&d);
        assert_eq!(path.as_deref(), Some("POST/3/page-7.json"));
    }

    #[test]
    fn pattern_with_unknown_name_yields_nothing() {
        let d = descriptor(&[]);
        assert_eq!(FilePattern::new("{status}.json").generate(&d), None);
    }

    #[test]
    fn empty_generated_path_means_do_not_persist() {
        let parts = RequestParts::default();
        let d = RequestDescriptor::new(
            0,
            parts,
            Arc::new(|_: &RequestDescriptor| Some(String::new())),
            Arc::new(IdentityHook),
            None,
        );
        assert_eq!(d.file_path(), None);
    }
}
