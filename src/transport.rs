//! HTTP transport: the trait the dispatcher calls and its reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result, TransportError};
use crate::request::{RequestParts, ResponseRecord};

/// Sends one resolved request and captures the full response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request
    ///
    /// # Errors
    ///
    /// Connection failures, timeouts and unreadable bodies are reported as
    /// [`TransportError`]. Non-2xx statuses are not errors.
    async fn send(&self, request: &RequestParts) -> std::result::Result<ResponseRecord, TransportError>;
}

/// [`Transport`] over a shared `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    require_json: bool,
}

impl ReqwestTransport {
    /// Client with the given per-request timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reqsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client (its own timeout and TLS settings apply)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            require_json: true,
        }
    }

    /// Whether a body that is not JSON fails the request (default `true`)
    pub fn require_json(mut self, require_json: bool) -> Self {
        self.require_json = require_json;
        self
    }

    fn build(&self, request: &RequestParts) -> std::result::Result<reqwest::RequestBuilder, TransportError> {
        let url = url::Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = self.client.request(request.method.into(), url);

        if !request.params.is_empty() {
            let query: Vec<(&str, String)> = request
                .params
                .iter()
                .map(|(k, v)| (k.as_str(), v.to_string()))
                .collect();
            builder = builder.query(&query);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.to_string());
        }

        if !request.cookies.is_empty() {
            let cookie = request
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }

        if let Some(credentials) = &request.auth {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }

        if !request.data.is_empty() {
            let form: Vec<(&str, String)> = request
                .data
                .iter()
                .map(|(k, v)| (k.as_str(), v.to_string()))
                .collect();
            builder = builder.form(&form);
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestParts) -> std::result::Result<ResponseRecord, TransportError> {
        let prepared = self
            .build(request)?
            .build()
            .map_err(|e| TransportError::from_reqwest(&request.url, &e))?;
        let sent_url = prepared.url().to_string();
        let response = self
            .client
            .execute(prepared)
            .await
            .map_err(|e| TransportError::from_reqwest(&request.url, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        let raw_content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let (content_type, encoding) = split_content_type(raw_content_type.as_deref());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body {
                url: request.url.clone(),
                reason: e.to_string(),
            })?
            .to_vec();

        let json = serde_json::from_slice::<serde_json::Value>(&bytes).ok();
        if self.require_json && json.is_none() {
            return Err(TransportError::Body {
                url: request.url.clone(),
                reason: format!("expected a JSON body (status {status})"),
            });
        }

        // reqwest follows redirects without exposing the hops; keep the origin
        let history = if final_url != sent_url {
            vec![sent_url]
        } else {
            Vec::new()
        };

        Ok(ResponseRecord {
            method: request.method,
            url: final_url,
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).into_owned(),
            json,
            bytes,
            encoding,
            history,
            content_type,
            received_at: Utc::now(),
        })
    }
}

// "application/json; charset=utf-8" -> ("application/json", "utf-8")
fn split_content_type(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    let mut parts = raw.split(';');
    let media = parts
        .next()
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let charset = parts.find_map(|p| {
        let (key, value) = p.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    });
    (media, charset)
}
