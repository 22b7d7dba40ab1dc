//! Error types for the request normalizer.
//!
//! # Design
//! Every failure the normalizer can hit maps to exactly one variant, so a
//! caller composing against the core can tell "never sent" (`InvalidTarget`,
//! `Serialization`) from "sent but failed" (`Transport`, `Http`, `Parse`).
//! A missing extraction key is not an error and has no variant.

use thiserror::Error;

/// The transport could not complete the round-trip (offline, DNS, aborted,
/// or a request the HTTP stack refused to send).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors surfaced by `Normalizer` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The target was empty. Detected before any transport call.
    #[error("invalid target: a non-empty URL is required")]
    InvalidTarget,

    /// The underlying network call failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("HTTP error! status: {status} {status_text}")]
    Http { status: u16, status_text: String },

    /// The body was not valid JSON while an extraction key was requested.
    #[error("response body is not valid JSON: {0}")]
    Parse(String),

    /// The request body could not be serialized to JSON.
    #[error("request body serialization failed: {0}")]
    Serialization(String),
}

impl FetchError {
    /// HTTP status for `Http` errors, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
