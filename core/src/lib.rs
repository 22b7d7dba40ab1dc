//! Request normalizer behind the `fetch` / `fetchjson` template helpers.
//!
//! # Overview
//! Turns a `RequestSpec` into one HTTP round-trip and normalizes the result
//! into either the raw body text or a single top-level JSON property. The
//! round-trip itself goes through a `Transport`, so the core never touches
//! the network directly and hosts can supply their own I/O.
//!
//! # Design
//! - `Normalizer` is stateless; `build_request` and `normalize` are the two
//!   halves of a fetch and `execute` joins them around one `Transport::send`.
//! - Every failure comes back as a typed `FetchError`. Folding errors into
//!   `""` / `null` happens only in `boundary::Fetcher`.
//! - The loading flag is driven through an injected `Activity`, never by the
//!   normalizer itself.

pub mod boundary;
pub mod error;
pub mod http;
pub mod normalizer;
pub mod transport;
pub mod types;

pub use boundary::{Activity, Callbacks, Fetcher, LoadingFlag, NoActivity};
pub use error::{FetchError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use normalizer::Normalizer;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use types::{RequestSpec, ResponseOutcome};
