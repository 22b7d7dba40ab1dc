//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The normalizer builds an
//! `HttpRequest` and consumes an `HttpResponse`; whoever sits between the two
//! (a `Transport` implementation or a C host) performs the actual I/O.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

use std::fmt;

/// HTTP method for a request.
///
/// Parsing upper-cases its input. Verbs outside the known set are kept as
/// `Other` and handed to the transport untouched; rejecting them is the
/// transport's job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Other(String),
}

impl HttpMethod {
    pub fn parse(method: &str) -> Self {
        let upper = method.to_ascii_uppercase();
        match upper.as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(verb) => verb,
        }
    }

    /// Only POST, PUT and PATCH carry a request body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        HttpMethod::parse(method)
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Normalizer::build_request`. The transport is responsible for
/// executing it and returning the corresponding `HttpResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// `status_text` is whatever the transport reports. `ReqwestTransport` only
/// sees the status code, so it fills in the canonical reason phrase and a
/// custom phrase sent by the server (`418 Teapot Error`) is not preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A response with the given status and body and no headers.
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_upper_cases_known_methods() {
        assert_eq!(HttpMethod::parse("get"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("Patch"), HttpMethod::Patch);
        assert_eq!(HttpMethod::parse("options"), HttpMethod::Options);
    }

    #[test]
    fn parse_keeps_surrounding_whitespace() {
        assert_eq!(HttpMethod::parse(" get").as_str(), " GET");
    }

    #[test]
    fn unknown_method_passes_through_upper_cased() {
        let method = HttpMethod::parse("purge");
        assert_eq!(method, HttpMethod::Other("PURGE".to_string()));
        assert_eq!(method.as_str(), "PURGE");
    }

    #[test]
    fn only_post_put_patch_allow_body() {
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Put.allows_body());
        assert!(HttpMethod::Patch.allows_body());
        assert!(!HttpMethod::Get.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
        assert!(!HttpMethod::Head.allows_body());
        assert!(!HttpMethod::Other("PURGE".to_string()).allows_body());
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::new(200, "OK", "").is_success());
        assert!(HttpResponse::new(204, "No Content", "").is_success());
        assert!(!HttpResponse::new(199, "", "").is_success());
        assert!(!HttpResponse::new(301, "Moved Permanently", "").is_success());
        assert!(!HttpResponse::new(404, "Not Found", "").is_success());
    }
}
