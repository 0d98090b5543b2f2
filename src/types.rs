//! Core value types and events for reqsweep

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SpecError;

/// A single string or integer value
///
/// Request fields only ever carry scalars once expanded; lists exist only in
/// the specification layer ([`AxisValue`]).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
}

impl Scalar {
    /// True for the empty string. Integers are never empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Str(s) if s.is_empty())
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Str(String::new())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<u32> for Scalar {
    fn from(i: u32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

/// Value supplied in a specification: a scalar or a list of values
///
/// Lists may syntactically contain lists; the expanders reject that with
/// [`SpecError::NestedSequence`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    /// Single value
    Scalar(Scalar),
    /// Ordered list of values
    List(Vec<AxisValue>),
}

impl AxisValue {
    /// Build a flat list from anything convertible to [`Scalar`].
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        AxisValue::List(
            values
                .into_iter()
                .map(|v| AxisValue::Scalar(v.into()))
                .collect(),
        )
    }

    /// Flatten a one-level list into scalars.
    ///
    /// A scalar becomes a one-element list. `field` and `key` only label the
    /// error when a nested list is found.
    pub(crate) fn flatten(&self, field: &str, key: &str) -> Result<Vec<Scalar>, SpecError> {
        match self {
            AxisValue::Scalar(s) => Ok(vec![s.clone()]),
            AxisValue::List(items) => items
                .iter()
                .map(|item| match item {
                    AxisValue::Scalar(s) => Ok(s.clone()),
                    AxisValue::List(_) => Err(SpecError::NestedSequence {
                        field: field.to_string(),
                        key: key.to_string(),
                    }),
                })
                .collect(),
        }
    }
}

macro_rules! axis_value_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AxisValue {
                fn from(value: $ty) -> Self {
                    AxisValue::Scalar(value.into())
                }
            }
        )*
    };
}

axis_value_from_scalar!(Scalar, &str, String, i64, i32, u32);

impl<T: Into<Scalar>> From<Vec<T>> for AxisValue {
    fn from(values: Vec<T>) -> Self {
        AxisValue::list(values)
    }
}

/// Resolved name → value mapping for params, headers, data and cookies
pub type Fields = BTreeMap<String, Scalar>;

/// HTTP methods accepted by the request factory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(SpecError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// HTTP basic credentials
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password (may be empty, e.g. API-key-as-username schemes)
    pub password: String,
}

impl Credentials {
    /// Create credentials from a user name and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when both parts are empty, i.e. "no auth"
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

// Password stays out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Lifecycle of a single request descriptor
///
/// `Pending → InFlight → {Completed | Stopped | Cancelled | Failed}`; a
/// descriptor that was never admitted stays `Pending` (stop signal) or moves
/// straight to `Cancelled` (batch failure).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestState {
    /// Not yet admitted by the network limiter
    #[default]
    Pending,
    /// Holding a network slot, transport call running
    InFlight,
    /// Response received and accepted
    Completed,
    /// Response received and matched the stop predicate
    Stopped,
    /// Abandoned because another request in the batch failed
    Cancelled,
    /// The transport call failed
    Failed(crate::error::TransportError),
}

impl RequestState {
    /// True once the descriptor will not change state again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Pending | RequestState::InFlight)
    }

    /// Short lowercase label for logs and events
    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::InFlight => "in_flight",
            RequestState::Completed => "completed",
            RequestState::Stopped => "stopped",
            RequestState::Cancelled => "cancelled",
            RequestState::Failed(_) => "failed",
        }
    }
}

/// Events emitted while a batch is dispatched
///
/// Subscribe with [`Dispatcher::subscribe`](crate::dispatch::Dispatcher::subscribe).
#[derive(Clone, Debug)]
pub enum Event {
    /// A response was accepted
    RequestCompleted {
        /// Position of the descriptor in the batch
        index: usize,
        /// Requested URL
        url: String,
        /// HTTP status
        status: u16,
    },
    /// A response matched the stop predicate; no further positions are admitted
    RequestStopped {
        /// Position of the descriptor in the batch
        index: usize,
        /// Requested URL
        url: String,
    },
    /// A transport call failed; pending work is cancelled
    RequestFailed {
        /// Position of the descriptor in the batch
        index: usize,
        /// Requested URL
        url: String,
        /// Failure message
        error: String,
    },
    /// A descriptor was cancelled before or during its call
    RequestCancelled {
        /// Position of the descriptor in the batch
        index: usize,
    },
    /// A response body was written
    Saved {
        /// Position of the descriptor in the batch
        index: usize,
        /// Destination path
        path: String,
    },
    /// A response body could not be written
    SaveFailed {
        /// Position of the descriptor in the batch
        index: usize,
        /// Destination path
        path: String,
        /// Failure message
        error: String,
    },
    /// Every admitted request of the batch has reached a terminal state
    BatchFinished {
        /// Number of completed descriptors
        completed: usize,
        /// Number of failed descriptors
        failed: usize,
    },
}
