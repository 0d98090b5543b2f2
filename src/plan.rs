//! Declarative sweep plans loaded from JSON.
//!
//! A plan names the method, the URL axis, the field specs and the dispatch
//! configuration in one document:
//!
//! ```json
//! {
//!   "method": "GET",
//!   "url": { "template": "https://api.example.com/{kind}", "args": { "kind": ["users", "teams"] } },
//!   "param": { "static": { "page_size": 100 }, "dynamic": { "page": [1, 2, 3] } },
//!   "header": { "static": { "Accept": "application/json" } },
//!   "auth": { "username": "key", "password": "" },
//!   "config": { "network": { "rate": 0.5, "limit": 4 }, "collect": true }
//! }
//! ```
//!
//! Every axis is type-checked before anything is expanded, and the request
//! family is then expanded once so that a plan that loads is a plan that
//! builds.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::{DispatchConfig, RateLimit, default_limit, default_rate_secs};
use crate::error::{Result, SpecError};
use crate::expand::{AuthSpec, FieldSpec, PathSpec, UrlTemplate};
use crate::request::{RequestFactory, UrlAxis};
use crate::types::{AxisValue, Method, Scalar};

/// A validated request family plus its dispatch configuration
#[derive(Clone, Debug)]
pub struct SweepPlan {
    /// HTTP method
    pub method: Method,
    /// URL axis
    pub url: UrlAxis,
    /// Query parameters
    pub param: FieldSpec,
    /// Request headers
    pub header: FieldSpec,
    /// Cookies
    pub cookie: FieldSpec,
    /// Form body
    pub data: FieldSpec,
    /// Basic-auth credentials
    pub auth: AuthSpec,
    /// Dispatch configuration
    pub config: DispatchConfig,
}

impl SweepPlan {
    /// Parse and validate a JSON plan
    ///
    /// # Errors
    ///
    /// - [`Error::Serialization`](crate::Error::Serialization) if the text is
    ///   not JSON or `config` does not deserialize
    /// - [`Error::Spec`](crate::Error::Spec) for any invalid axis, including
    ///   [`SpecError::TypeMismatch`] when an axis has the wrong JSON type and
    ///   [`SpecError::InvalidRateLimit`] for a bad `config.network` or
    ///   `config.storage`
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Validate an already parsed plan
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = expect_object("plan", value)?;

        let method = match root.get("method") {
            None | Some(Value::Null) => Method::Get,
            Some(Value::String(s)) => s.to_ascii_uppercase().parse()?,
            Some(other) => return Err(mismatch("method", "string", other).into()),
        };

        let config = match root.get("config") {
            None | Some(Value::Null) => DispatchConfig::default(),
            Some(v) => {
                let object = expect_object("config", v)?;
                for key in ["network", "storage"] {
                    if let Some(limit) = object.get(key).filter(|l| !l.is_null()) {
                        rate_limit(&format!("config.{key}"), limit)?;
                    }
                }
                serde_json::from_value(v.clone())?
            }
        };

        let url = match root.get("url") {
            Some(v) => url_axis(v, &config)?,
            None => return Err(mismatch("url", "string, list or object", &Value::Null).into()),
        };

        let param = field_spec("param", root.get("param"))?;
        let header = field_spec("header", root.get("header"))?;
        let cookie = field_spec("cookie", root.get("cookie"))?;
        let data = field_spec("data", root.get("data"))?;

        let auth = auth_spec(root.get("auth"))?.alignment(config.alignment);

        let plan = Self {
            method,
            url,
            param,
            header,
            cookie,
            data,
            auth,
            config,
        };

        let descriptors = plan.factory().build()?;
        tracing::debug!(
            method = %plan.method,
            requests = descriptors.len(),
            "Loaded sweep plan"
        );

        Ok(plan)
    }

    /// Factory for this plan's request family (no hooks or storage attached)
    pub fn factory(&self) -> RequestFactory {
        RequestFactory::new(self.url.clone())
            .method(self.method)
            .param(self.param.clone())
            .header(self.header.clone())
            .cookie(self.cookie.clone())
            .data(self.data.clone())
            .auth(self.auth.clone())
            .alignment(self.config.alignment)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn mismatch(axis: &str, expected: &'static str, found: &Value) -> SpecError {
    SpecError::TypeMismatch {
        axis: axis.to_string(),
        expected,
        found: kind(found),
    }
}

fn expect_object<'a>(axis: &str, value: &'a Value) -> std::result::Result<&'a Map<String, Value>, SpecError> {
    value.as_object().ok_or_else(|| mismatch(axis, "object", value))
}

// Checked ahead of serde so that a bad limit reports as a spec error
fn rate_limit(axis: &str, value: &Value) -> std::result::Result<RateLimit, SpecError> {
    let object = expect_object(axis, value)?;
    let rate = match object.get("rate") {
        None | Some(Value::Null) => default_rate_secs(),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| mismatch(&format!("{axis}.rate"), "number", v))?,
    };
    let limit = match object.get("limit") {
        None | Some(Value::Null) => default_limit(),
        Some(v) => v
            .as_u64()
            .and_then(|l| usize::try_from(l).ok())
            .ok_or_else(|| mismatch(&format!("{axis}.limit"), "non-negative integer", v))?,
    };
    RateLimit::new(rate, limit)
}

fn scalar(axis: &str, value: &Value) -> std::result::Result<Scalar, SpecError> {
    match value {
        Value::String(s) => Ok(Scalar::Str(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .ok_or_else(|| mismatch(axis, "string or integer", value)),
        other => Err(mismatch(axis, "string or integer", other)),
    }
}

fn axis_value(axis: &str, value: &Value) -> std::result::Result<AxisValue, SpecError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| axis_value(axis, item))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AxisValue::List),
        other => scalar(axis, other).map(AxisValue::Scalar),
    }
}

fn axis_map(
    axis: &str,
    value: Option<&Value>,
) -> std::result::Result<BTreeMap<String, AxisValue>, SpecError> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(v) => expect_object(axis, v)?
            .iter()
            .map(|(k, v)| Ok((k.clone(), axis_value(&format!("{axis}.{k}"), v)?)))
            .collect(),
    }
}

fn field_spec(axis: &str, value: Option<&Value>) -> std::result::Result<FieldSpec, SpecError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(FieldSpec::empty());
    };
    let object = expect_object(axis, value)?;
    let fixed = axis_map(&format!("{axis}.static"), object.get("static"))?;
    let dynamic = axis_map(&format!("{axis}.dynamic"), object.get("dynamic"))?;
    FieldSpec::new(axis, fixed, dynamic)
}

fn auth_spec(value: Option<&Value>) -> std::result::Result<AuthSpec, SpecError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(AuthSpec::default());
    };
    let object = expect_object("auth", value)?;
    let part = |key: &str| match object.get(key) {
        None | Some(Value::Null) => Ok(AxisValue::from("")),
        Some(v) => axis_value(&format!("auth.{key}"), v),
    };
    Ok(AuthSpec::new(part("username")?, part("password")?))
}

fn url_axis(value: &Value, config: &DispatchConfig) -> std::result::Result<UrlAxis, SpecError> {
    match value {
        Value::String(url) => Ok(UrlAxis::from(url.as_str())),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(url) => Ok(url.clone()),
                other => Err(mismatch("url", "list of strings", other)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(UrlAxis::List),
        Value::Object(object) => {
            if let Some(template) = object.get("template") {
                let Value::String(template) = template else {
                    return Err(mismatch("url.template", "string", template));
                };
                let args = axis_map("url.args", object.get("args"))?;
                Ok(UrlAxis::Template(
                    UrlTemplate::with_args(template.as_str(), args).alignment(config.alignment),
                ))
            } else if let Some(base) = object.get("base") {
                let Value::String(base) = base else {
                    return Err(mismatch("url.base", "string", base));
                };
                Ok(UrlAxis::joined(base.as_str(), path_spec(object.get("path"))?))
            } else {
                Err(mismatch("url", "object with 'template' or 'base'", value))
            }
        }
        other => Err(mismatch("url", "string, list or object", other)),
    }
}

fn path_spec(value: Option<&Value>) -> std::result::Result<PathSpec, SpecError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return PathSpec::new(AxisValue::List(Vec::new()), Vec::new(), "/");
    };
    let object = expect_object("url.path", value)?;

    let fixed = match object.get("static") {
        None | Some(Value::Null) => AxisValue::List(Vec::new()),
        Some(v) => axis_value("url.path.static", v)?,
    };
    let dynamic = match object.get("dynamic") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| axis_value("url.path.dynamic", item))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(other) => return Err(mismatch("url.path.dynamic", "list", other)),
    };
    let delimiter = match object.get("delimiter") {
        None | Some(Value::Null) => "/",
        Some(Value::String(d)) => d.as_str(),
        Some(other) => return Err(mismatch("url.path.delimiter", "string", other)),
    };

    PathSpec::new(fixed, dynamic, delimiter)
}
