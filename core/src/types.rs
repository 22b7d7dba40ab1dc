//! Request and outcome types.
//!
//! # Design
//! `RequestSpec` is what a caller asks for: a target, a method, extra headers
//! and an optional JSON body. It is independent of the wire-level
//! `HttpRequest` the normalizer derives from it, so defaults (method, the
//! content-type header, body gating) live in one place.

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::FetchError;
use crate::http::HttpMethod;

/// A single fetch as requested by a caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestSpec {
    pub target: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    /// A GET request against `target` with no extra headers or body.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: impl Into<HttpMethod>) -> Self {
        self.method = method.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a body. A `Value::String` is sent verbatim, anything else is
    /// serialized to JSON text. Ignored unless the method is POST, PUT or PATCH.
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach any serializable value as the body.
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, FetchError> {
        let value =
            serde_json::to_value(body).map_err(|e| FetchError::Serialization(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// A successful, normalized response.
///
/// The failure arm is the `Err(FetchError)` of the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Raw body text, returned when no extraction key was given.
    Text(String),
    /// The extracted property, `Value::Null` when the key was absent.
    Json(Value),
}

impl ResponseOutcome {
    /// Render the outcome as text. JSON strings are returned unquoted.
    pub fn into_text(self) -> String {
        match self {
            ResponseOutcome::Text(text) => text,
            ResponseOutcome::Json(Value::String(s)) => s,
            ResponseOutcome::Json(Value::Null) => String::new(),
            ResponseOutcome::Json(value) => value.to_string(),
        }
    }

    /// Interpret the outcome as JSON, parsing `Text` bodies as a whole document.
    pub fn into_json(self) -> Result<Value, FetchError> {
        match self {
            ResponseOutcome::Text(text) => serde_json::from_str(&text).map_err(|e| {
                error!(error = %e, "fetchjson body is not valid JSON");
                FetchError::Parse(e.to_string())
            }),
            ResponseOutcome::Json(value) => Ok(value),
        }
    }
}
