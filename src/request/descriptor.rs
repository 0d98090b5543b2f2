//! Request descriptors and captured responses.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::Storage;
use crate::types::{Credentials, Fields, Method, RequestState};

use super::hooks::{FilePathGenerator, ResponseHook};

/// Everything the transport needs to send one request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestParts {
    /// HTTP method
    pub method: Method,
    /// Fully resolved URL
    pub url: String,
    /// Query parameters
    pub params: Fields,
    /// Request headers
    pub headers: Fields,
    /// Basic-auth credentials (`None` means no auth)
    pub auth: Option<Credentials>,
    /// Form body fields
    pub data: Fields,
    /// Cookies sent with the request
    pub cookies: Fields,
}

/// Response captured in full before the connection is released
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResponseRecord {
    /// Method of the request that produced this response
    pub method: Method,
    /// Final URL (after redirects)
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers in received order
    pub headers: Vec<(String, String)>,
    /// Body decoded as text; this is what storage persists, so a response
    /// hook that rewrites it controls the saved body
    pub text: String,
    /// Body parsed as JSON, when it parses
    pub json: Option<serde_json::Value>,
    /// Raw body
    pub bytes: Vec<u8>,
    /// Charset announced by the server
    pub encoding: Option<String>,
    /// URLs visited before the final one
    pub history: Vec<String>,
    /// Media type without parameters
    pub content_type: Option<String>,
    /// When the body finished arriving
    pub received_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One fully resolved request of a family, plus its outcome
///
/// Built by the [`RequestFactory`](super::RequestFactory), consumed once by the
/// [`Dispatcher`](crate::dispatch::Dispatcher). Only the dispatch task that
/// owns it records the state and the response.
#[derive(Clone)]
pub struct RequestDescriptor {
    index: usize,
    parts: RequestParts,
    file_path: Arc<dyn FilePathGenerator>,
    hook: Arc<dyn ResponseHook>,
    storage: Option<Arc<dyn Storage>>,
    state: RequestState,
    response: Option<ResponseRecord>,
}

impl RequestDescriptor {
    pub(crate) fn new(
        index: usize,
        parts: RequestParts,
        file_path: Arc<dyn FilePathGenerator>,
        hook: Arc<dyn ResponseHook>,
        storage: Option<Arc<dyn Storage>>,
    ) -> Self {
        Self {
            index,
            parts,
            file_path,
            hook,
            storage,
            state: RequestState::Pending,
            response: None,
        }
    }

    /// Position in the expanded family
    pub fn index(&self) -> usize {
        self.index
    }

    /// Resolved request
    pub fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// HTTP method
    pub fn method(&self) -> Method {
        self.parts.method
    }

    /// Resolved URL
    pub fn url(&self) -> &str {
        &self.parts.url
    }

    /// Current lifecycle state
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Response, once completed or stopped
    pub fn response(&self) -> Option<&ResponseRecord> {
        self.response.as_ref()
    }

    /// Storage backend this descriptor saves into, if any
    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }

    /// Destination path for the response body
    ///
    /// `None` (or an empty string from the generator) means "do not persist".
    pub fn file_path(&self) -> Option<String> {
        self.file_path
            .generate(self)
            .filter(|path| !path.is_empty())
    }

    pub(crate) fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }

    pub(crate) fn hook(&self) -> &Arc<dyn ResponseHook> {
        &self.hook
    }

    pub(crate) fn set_state(&mut self, state: RequestState) {
        self.state = state;
    }

    pub(crate) fn attach_response(&mut self, response: ResponseRecord) {
        self.response = Some(response);
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("index", &self.index)
            .field("method", &self.parts.method)
            .field("url", &self.parts.url)
            .field("state", &self.state)
            .field("has_response", &self.response.is_some())
            .field("has_storage", &self.storage.is_some())
            .finish()
    }
}
