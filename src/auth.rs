//! Auth providers and their composition with resolved requests.

use crate::request::RequestParts;
use crate::types::{Credentials, Fields, Scalar};

/// Source of authentication material for every request of a sweep
///
/// All methods default to "nothing", so a provider only implements what it
/// supplies.
pub trait AuthProvider: Send + Sync {
    /// Headers to add
    fn header(&self) -> Fields {
        Fields::new()
    }

    /// Query parameters to add
    fn param(&self) -> Fields {
        Fields::new()
    }

    /// Basic credentials to use instead of the request's own
    fn auth(&self) -> Option<Credentials> {
        None
    }
}

/// Provider that adds nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

impl AuthProvider for NoAuth {}

/// Provider with fixed headers, params and credentials
///
/// # Examples
///
/// ```
/// use reqsweep::auth::{AuthProvider, StaticAuth};
///
/// let provider = StaticAuth::new().bearer("t0k3n").param("api_version", "2");
/// assert_eq!(AuthProvider::header(&provider)["Authorization"].to_string(), "Bearer t0k3n");
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticAuth {
    header: Fields,
    param: Fields,
    auth: Option<Credentials>,
}

impl StaticAuth {
    /// Empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.header.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.param.insert(name.into(), value.into());
        self
    }

    /// Use HTTP basic credentials
    pub fn basic(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Credentials::new(username, password));
        self
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }
}

impl AuthProvider for StaticAuth {
    fn header(&self) -> Fields {
        self.header.clone()
    }

    fn param(&self) -> Fields {
        self.param.clone()
    }

    fn auth(&self) -> Option<Credentials> {
        self.auth.clone()
    }
}

/// Overlay a provider onto a resolved request; the provider wins on collision
///
/// Headers and params are merged key by key. Credentials are replaced only
/// when the provider supplies non-empty ones.
pub fn merge_auth<P: AuthProvider + ?Sized>(provider: &P, parts: &mut RequestParts) {
    parts.headers.extend(provider.header());
    parts.params.extend(provider.param());
    if let Some(credentials) = provider.auth().filter(|c| !c.is_empty()) {
        parts.auth = Some(credentials);
    }
}
