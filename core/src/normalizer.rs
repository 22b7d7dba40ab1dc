//! Request builder and response normalizer.
//!
//! # Design
//! `Normalizer` holds only its default headers and carries no mutable state
//! between calls. A fetch is split into `build_request`, which turns a
//! `RequestSpec` into an `HttpRequest`, and `normalize`, which turns the
//! `HttpResponse` into a `ResponseOutcome`. `execute` glues the two around a
//! single `Transport::send`; hosts that do their own I/O call the halves
//! directly.
//!
//! Each failure is logged once, at the point it is detected.

use serde_json::Value;
use tracing::{debug, error};

use crate::error::{FetchError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{RequestSpec, ResponseOutcome};

pub const DEFAULT_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json");

/// Stateless request/response normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_headers: Vec<(String, String)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// A normalizer sending `Content-Type: application/json` by default.
    pub fn new() -> Self {
        Self {
            default_headers: vec![(
                DEFAULT_CONTENT_TYPE.0.to_string(),
                DEFAULT_CONTENT_TYPE.1.to_string(),
            )],
        }
    }

    /// Add or replace a default header. Caller headers still override it.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        merge_header(&mut self.default_headers, name.into(), value.into());
        self
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    pub fn build_request(&self, spec: &RequestSpec) -> Result<HttpRequest, FetchError> {
        if spec.target.trim().is_empty() {
            error!("fetch rejected: empty target");
            return Err(FetchError::InvalidTarget);
        }

        let mut headers = self.default_headers.clone();
        for (name, value) in &spec.headers {
            merge_header(&mut headers, name.clone(), value.clone());
        }

        let body = match &spec.body {
            Some(body) if spec.method.allows_body() => Some(encode_body(body).inspect_err(|e| {
                error!(target_url = %spec.target, error = %e, "fetch rejected");
            })?),
            _ => None,
        };

        Ok(HttpRequest {
            method: spec.method.clone(),
            url: spec.target.clone(),
            headers,
            body,
        })
    }

    /// Turn a completed response into an outcome.
    ///
    /// The status is checked before the body is looked at. Without a key the
    /// body is returned as text; with a key the body must parse as JSON and
    /// the key's value (or `null` when absent) is returned.
    pub fn normalize(
        &self,
        response: HttpResponse,
        extraction_key: Option<&str>,
    ) -> Result<ResponseOutcome, FetchError> {
        check_status(&response)?;
        match extraction_key {
            None => Ok(ResponseOutcome::Text(response.body)),
            Some(key) => extract(&response.body, key).map(ResponseOutcome::Json),
        }
    }

    /// Build, send once, normalize.
    pub async fn execute<T: Transport>(
        &self,
        transport: &T,
        spec: &RequestSpec,
        extraction_key: Option<&str>,
    ) -> Result<ResponseOutcome, FetchError> {
        let request = self.build_request(spec)?;
        debug!(method = %request.method, url = %request.url, "issuing fetch");

        let response = transport
            .send(request)
            .await
            .map_err(|e| self.transport_failure(&spec.target, e))?;

        self.normalize(response, extraction_key)
    }

    /// Record a transport rejection. Hosts doing their own I/O call this so
    /// their failures are logged like any other.
    pub fn transport_failure(&self, target: &str, err: TransportError) -> FetchError {
        error!(target_url = %target, error = %err, "fetch transport failed");
        FetchError::Transport(err)
    }
}

/// Insert a header, replacing any entry whose name matches case-insensitively.
/// The replacement keeps the new name's spelling and the original position.
fn merge_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
        Some(slot) => *slot = (name, value),
        None => headers.push((name, value)),
    }
}

fn encode_body(body: &Value) -> Result<String, FetchError> {
    match body {
        Value::String(raw) => Ok(raw.clone()),
        other => serde_json::to_string(other).map_err(|e| FetchError::Serialization(e.to_string())),
    }
}

fn check_status(response: &HttpResponse) -> Result<(), FetchError> {
    if response.is_success() {
        return Ok(());
    }
    error!(
        status = response.status,
        status_text = %response.status_text,
        "fetch returned non-success status"
    );
    Err(FetchError::Http {
        status: response.status,
        status_text: response.status_text.clone(),
    })
}

/// A missing key, or a body that is not an object, yields `null`.
fn extract(body: &str, key: &str) -> Result<Value, FetchError> {
    let mut parsed: Value = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "fetch body is not valid JSON");
        FetchError::Parse(e.to_string())
    })?;
    Ok(parsed
        .as_object_mut()
        .and_then(|obj| obj.remove(key))
        .unwrap_or(Value::Null))
}
