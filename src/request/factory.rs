//! Request factory: aligns every axis and zips them into descriptors.

use std::sync::Arc;

use crate::config::Alignment;
use crate::error::SpecError;
use crate::expand::{AuthSpec, FieldSpec, PathSpec, UrlTemplate, aligned_len, fill_forward_get};
use crate::storage::Storage;
use crate::types::{Credentials, Fields, Method};

use super::descriptor::{RequestDescriptor, RequestParts};
use super::hooks::{FilePathGenerator, IdentityHook, NoFilePath, ResponseHook};

/// Where the URLs of a request family come from
#[derive(Clone, Debug, PartialEq)]
pub enum UrlAxis {
    /// Explicit list of URLs
    List(Vec<String>),
    /// `{placeholder}` template plus arguments
    Template(UrlTemplate),
    /// Base URL followed by expanded path segments
    Joined {
        /// Base URL, a trailing `/` is optional
        base: String,
        /// Segments appended after the base
        path: PathSpec,
    },
}

impl UrlAxis {
    /// Base URL plus path segments, joined with `/`
    pub fn joined(base: impl Into<String>, path: PathSpec) -> Self {
        UrlAxis::Joined {
            base: base.into(),
            path,
        }
    }

    /// Resolve to concrete URLs, in order
    pub fn expand(&self) -> Result<Vec<String>, SpecError> {
        match self {
            UrlAxis::List(urls) => Ok(urls.clone()),
            UrlAxis::Template(template) => template.expand(),
            UrlAxis::Joined { base, path } => {
                let base = base.trim_end_matches('/');
                Ok(path
                    .expand()
                    .into_iter()
                    .map(|p| {
                        if p.is_empty() {
                            base.to_string()
                        } else {
                            format!("{base}/{}", p.trim_start_matches('/'))
                        }
                    })
                    .collect())
            }
        }
    }
}

impl From<&str> for UrlAxis {
    fn from(url: &str) -> Self {
        UrlAxis::List(vec![url.to_string()])
    }
}

impl From<String> for UrlAxis {
    fn from(url: String) -> Self {
        UrlAxis::List(vec![url])
    }
}

impl From<Vec<String>> for UrlAxis {
    fn from(urls: Vec<String>) -> Self {
        UrlAxis::List(urls)
    }
}

impl From<UrlTemplate> for UrlAxis {
    fn from(template: UrlTemplate) -> Self {
        UrlAxis::Template(template)
    }
}

/// Builds the ordered descriptors of one request family
///
/// Every axis (URL, param, header, auth, data, cookie) is expanded first; the
/// resulting sequences are then aligned and zipped so position `i` of every
/// axis lands in descriptor `i`.
///
/// # Examples
///
/// ```
/// use reqsweep::expand::{FieldSpec, UrlTemplate};
/// use reqsweep::request::RequestFactory;
/// use reqsweep::types::AxisValue;
///
/// let factory = RequestFactory::new(UrlTemplate::new("http://h/{id}").arg("id", AxisValue::list([1, 2])))
///     .param(FieldSpec::builder("param").fixed("v", 1).build().unwrap());
///
/// let descriptors = factory.build().unwrap();
/// assert_eq!(descriptors.len(), 2);
/// assert_eq!(descriptors[1].url(), "http://h/2");
/// ```
#[derive(Clone)]
pub struct RequestFactory {
    method: Method,
    url: UrlAxis,
    param: FieldSpec,
    header: FieldSpec,
    auth: AuthSpec,
    data: FieldSpec,
    cookie: FieldSpec,
    alignment: Alignment,
    file_path: Arc<dyn FilePathGenerator>,
    hook: Arc<dyn ResponseHook>,
    storage: Option<Arc<dyn Storage>>,
}

impl RequestFactory {
    /// GET requests against the given URL axis with empty fields
    pub fn new(url: impl Into<UrlAxis>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            param: FieldSpec::empty(),
            header: FieldSpec::empty(),
            auth: AuthSpec::default(),
            data: FieldSpec::empty(),
            cookie: FieldSpec::empty(),
            alignment: Alignment::FillForward,
            file_path: Arc::new(NoFilePath),
            hook: Arc::new(IdentityHook),
            storage: None,
        }
    }

    /// HTTP method for every request
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Query parameters
    pub fn param(mut self, spec: FieldSpec) -> Self {
        self.param = spec;
        self
    }

    /// Request headers
    pub fn header(mut self, spec: FieldSpec) -> Self {
        self.header = spec;
        self
    }

    /// Basic-auth credentials
    pub fn auth(mut self, spec: AuthSpec) -> Self {
        self.auth = spec;
        self
    }

    /// Form body
    pub fn data(mut self, spec: FieldSpec) -> Self {
        self.data = spec;
        self
    }

    /// Cookies
    pub fn cookie(mut self, spec: FieldSpec) -> Self {
        self.cookie = spec;
        self
    }

    /// How axes of different lengths are combined
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Where each response body is written
    pub fn file_path(mut self, generator: impl FilePathGenerator + 'static) -> Self {
        self.file_path = Arc::new(generator);
        self
    }

    /// Transform applied to each accepted response
    pub fn hook(mut self, hook: impl ResponseHook + 'static) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    /// Storage backend shared by every descriptor
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Configured HTTP method
    pub fn configured_method(&self) -> Method {
        self.method
    }

    /// Expand, align and zip every axis
    ///
    /// Nothing is dispatched; any [`SpecError`] surfaces here, before the
    /// first request exists. An empty URL axis yields an empty family.
    pub fn build(&self) -> Result<Vec<RequestDescriptor>, SpecError> {
        let urls = self.url.expand()?;
        if urls.is_empty() {
            tracing::debug!(method = %self.method, "URL axis is empty, no requests");
            return Ok(Vec::new());
        }
        let params = self.param.expand();
        let headers = self.header.expand();
        let auths = self.auth.expand()?;
        let data = self.data.expand();
        let cookies = self.cookie.expand();

        let lengths = [
            urls.len(),
            params.len(),
            headers.len(),
            auths.len(),
            data.len(),
            cookies.len(),
        ];
        let len = aligned_len(&lengths, self.alignment)?;

        tracing::debug!(
            method = %self.method,
            requests = len,
            ?lengths,
            "Expanded request family"
        );

        Ok((0..len)
            .map(|i| {
                let credentials: Credentials = fill_forward_get(&auths, i);
                let parts = RequestParts {
                    method: self.method,
                    url: fill_forward_get(&urls, i),
                    params: fill_forward_get::<Fields>(&params, i),
                    headers: fill_forward_get::<Fields>(&headers, i),
                    auth: (!credentials.is_empty()).then_some(credentials),
                    data: fill_forward_get::<Fields>(&data, i),
                    cookies: fill_forward_get::<Fields>(&cookies, i),
                };
                RequestDescriptor::new(
                    i,
                    parts,
                    Arc::clone(&self.file_path),
                    Arc::clone(&self.hook),
                    self.storage.clone(),
                )
            })
            .collect())
    }
}

impl std::fmt::Debug for RequestFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFactory")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("param", &self.param)
            .field("header", &self.header)
            .field("auth", &self.auth)
            .field("data", &self.data)
            .field("cookie", &self.cookie)
            .field("alignment", &self.alignment)
            .finish_non_exhaustive()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AxisValue, Scalar};

    #[test]
    fn descriptor_urls_follow_url_axis() {
        let template = UrlTemplate::new("http://h/{a}/{b}")
            .arg("a", "x")
            .arg("b", AxisValue::list(["p", "q", "r"]));
        let urls = template.expand().unwrap();

        let descriptors = RequestFactory::new(template).build().unwrap();
        assert_eq!(descriptors.len(), urls.len());
        for (i, d) in descriptors.iter().enumerate() {
            assert_eq!(d.index(), i);
            assert_eq!(d.url(), urls[i]);
        }
    }

    #[test]
    fn shorter_axes_fill_forward() {
        let descriptors = RequestFactory::new(UrlAxis::List(vec!["http://h/1".into()]))
            .param(
                FieldSpec::builder("param")
                    .varying("page", AxisValue::list([1, 2, 3]))
                    .build()
                    .unwrap(),
            )
            .header(
                FieldSpec::builder("header")
                    .varying("x-shard", AxisValue::list(["a", "b"]))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(descriptors.len(), 3);
        let last = descriptors[2].parts();
        assert_eq!(last.url, "http://h/1");
        assert_eq!(last.params["page"], Scalar::Int(3));
        assert_eq!(last.headers["x-shard"], Scalar::from("b"));
    }

    #[test]
    fn empty_credentials_mean_no_auth() {
        let descriptors = RequestFactory::new("http://h").build().unwrap();
        assert_eq!(descriptors[0].parts().auth, None);

        let descriptors = RequestFactory::new("http://h")
            .auth(AuthSpec::new("user", "pw"))
            .build()
            .unwrap();
        assert_eq!(
            descriptors[0].parts().auth,
            Some(Credentials::new("user", "pw"))
        );
    }

    #[test]
    fn strict_alignment_rejects_padding() {
        let err = RequestFactory::new(UrlAxis::List(vec!["http://h/1".into(), "http://h/2".into()]))
            .param(
                FieldSpec::builder("param")
                    .varying("page", AxisValue::list([1, 2, 3]))
                    .build()
                    .unwrap(),
            )
            .alignment(Alignment::Strict)
            .build()
            .unwrap_err();
        assert!(matches!(err, SpecError::MismatchedAxisLengths { .. }));
    }

    #[test]
    fn unresolved_template_fails_before_any_descriptor() {
        let err = RequestFactory::new(UrlTemplate::new("http://h/{a}/{b}").arg("a", 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, SpecError::UnresolvedPlaceholder { .. }));
    }

    #[test]
    fn empty_dynamic_axis_keeps_static_fields() {
        let descriptors = RequestFactory::new(UrlAxis::List(vec!["a".into(), "b".into()]))
            .param(
                FieldSpec::builder("param")
                    .fixed("token", "t")
                    .varying("page", AxisValue::List(vec![]))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(descriptors.len(), 2);
        for d in &descriptors {
            assert_eq!(d.parts().params.len(), 1);
            assert_eq!(d.parts().params["token"], Scalar::from("t"));
        }
    }

    #[test]
    fn empty_url_list_yields_empty_family() {
        let descriptors = RequestFactory::new(UrlAxis::List(vec![]))
            .param(
                FieldSpec::builder("param")
                    .varying("page", AxisValue::list(1..=3))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert!(descriptors.is_empty());
    }

    #[test]
    fn joined_axis_appends_path_segments() {
        let path = PathSpec::from_segments(
            vec![AxisValue::from("v1"), AxisValue::list(["users", "teams"])],
            "/",
        )
        .unwrap();
        let urls = UrlAxis::joined("https://api.example.com/", path)
            .expand()
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com/v1/users",
                "https://api.example.com/v1/teams"
            ]
        );
    }

    #[test]
    fn method_applies_to_every_descriptor() {
        let descriptors = RequestFactory::new(UrlAxis::List(vec!["a".into(), "b".into()]))
            .method(Method::Delete)
            .build()
            .unwrap();
        assert!(descriptors.iter().all(|d| d.method() == Method::Delete));
    }
}
