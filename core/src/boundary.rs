//! The outer boundary: `fetch`, `fetchjson` and `fetchLoading`.
//!
//! # Design
//! `Fetcher` is what an embedding host registers under the three template
//! names. It wraps `Normalizer::execute` with an injected `Activity` (mark
//! busy / mark idle) and is the only place where a `FetchError` is folded into
//! a fallback value: `""` for `fetch`, `null` for `fetch_json`. Callers that
//! want the error use `Fetcher::execute` or the `Normalizer` directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::error::FetchError;
use crate::normalizer::Normalizer;
use crate::transport::Transport;
use crate::types::{RequestSpec, ResponseOutcome};

/// Name of the text fetch as seen by templates.
pub const FETCH: &str = "fetch";
/// Name of the JSON fetch as seen by templates.
pub const FETCH_JSON: &str = "fetchjson";
/// Name of the loading flag as seen by templates.
pub const FETCH_LOADING: &str = "fetchLoading";

/// Busy/idle notifications around each request.
pub trait Activity: Send + Sync {
    fn mark_busy(&self);
    fn mark_idle(&self);
}

/// Activity that ignores notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActivity;

impl Activity for NoActivity {
    fn mark_busy(&self) {}
    fn mark_idle(&self) {}
}

/// Adapts a pair of closures into an `Activity`.
pub struct Callbacks<B, I> {
    busy: B,
    idle: I,
}

impl<B, I> Callbacks<B, I>
where
    B: Fn() + Send + Sync,
    I: Fn() + Send + Sync,
{
    pub fn new(busy: B, idle: I) -> Self {
        Self { busy, idle }
    }
}

impl<B, I> Activity for Callbacks<B, I>
where
    B: Fn() + Send + Sync,
    I: Fn() + Send + Sync,
{
    fn mark_busy(&self) {
        (self.busy)()
    }

    fn mark_idle(&self) {
        (self.idle)()
    }
}

/// Shared loading state for templates to bind against.
///
/// Counts requests in flight, so overlapping fetches keep it set until the
/// last one finishes. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag {
    in_flight: Arc<AtomicUsize>,
}

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Activity for LoadingFlag {
    fn mark_busy(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    fn mark_idle(&self) {
        // Saturate so an unpaired idle from a foreign caller cannot wrap.
        let _ = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

/// Marks idle when dropped, so failures and dropped futures still pair up.
struct BusyGuard<'a> {
    activity: &'a dyn Activity,
}

impl<'a> BusyGuard<'a> {
    fn enter(activity: &'a dyn Activity) -> Self {
        activity.mark_busy();
        Self { activity }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.activity.mark_idle();
    }
}

/// Template-facing wrapper around a `Normalizer` and a `Transport`.
pub struct Fetcher<T> {
    transport: T,
    normalizer: Normalizer,
    activity: Arc<dyn Activity>,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            normalizer: Normalizer::new(),
            activity: Arc::new(NoActivity),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn Activity>) -> Self {
        self.activity = activity;
        self
    }

    /// Drive `loading` from this fetcher's requests.
    pub fn with_loading_flag(self, loading: &LoadingFlag) -> Self {
        self.with_activity(Arc::new(loading.clone()))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one fetch between busy and idle, surfacing any error.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        extraction_key: Option<&str>,
    ) -> Result<ResponseOutcome, FetchError> {
        let _guard = BusyGuard::enter(self.activity.as_ref());
        self.normalizer
            .execute(&self.transport, spec, extraction_key)
            .await
    }

    /// Body text, or `""` on any failure.
    pub async fn fetch(&self, spec: &RequestSpec) -> String {
        self.execute(spec, None)
            .await
            .map(ResponseOutcome::into_text)
            .unwrap_or_default()
    }

    /// The value under `extraction_key`, or the whole parsed body when no key
    /// is given. `null` on any failure.
    pub async fn fetch_json(&self, spec: &RequestSpec, extraction_key: Option<&str>) -> Value {
        self.execute(spec, extraction_key)
            .await
            .and_then(ResponseOutcome::into_json)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};

    /// Routes on the URL path the same way the mock server does.
    #[derive(Default)]
    struct RouteTransport {
        seen_loading: Mutex<Vec<bool>>,
        flag: Option<LoadingFlag>,
    }

    impl Transport for RouteTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            if let Some(flag) = &self.flag {
                self.seen_loading.lock().unwrap().push(flag.is_loading());
            }
            let url = request.url.as_str();
            if url.ends_with("/json") {
                Ok(HttpResponse::new(200, "OK", r#"{"weather":"sunny","temperature":25}"#))
            } else if url.ends_with("/text") {
                Ok(HttpResponse::new(200, "OK", "Hello World!"))
            } else if url.ends_with("/error") {
                Ok(HttpResponse::new(404, "Not Found", ""))
            } else if url.ends_with("/offline") {
                Err(TransportError::new("network unreachable"))
            } else if url.ends_with("/hang") {
                std::future::pending().await
            } else {
                Ok(HttpResponse::new(200, "OK", "Default response"))
            }
        }
    }

    fn fetcher() -> Fetcher<RouteTransport> {
        Fetcher::new(RouteTransport::default())
    }

    #[test]
    fn template_names() {
        assert_eq!(FETCH, "fetch");
        assert_eq!(FETCH_JSON, "fetchjson");
        assert_eq!(FETCH_LOADING, "fetchLoading");
    }

    #[tokio::test]
    async fn fetch_returns_text() {
        let text = fetcher().fetch(&RequestSpec::new("https://example.com/text")).await;
        assert_eq!(text, "Hello World!");
    }

    #[tokio::test]
    async fn fetch_accepts_method_headers_and_body() {
        let spec = RequestSpec::new("https://example.com/text")
            .method("POST")
            .header("Authorization", "Bearer token")
            .body(json!({"name": "test"}));
        assert_eq!(fetcher().fetch(&spec).await, "Hello World!");
    }

    #[tokio::test]
    async fn fetch_failures_become_empty_string() {
        let f = fetcher();
        assert_eq!(f.fetch(&RequestSpec::new("https://example.com/error")).await, "");
        assert_eq!(f.fetch(&RequestSpec::new("https://example.com/offline")).await, "");
        assert_eq!(f.fetch(&RequestSpec::new("")).await, "");
    }

    #[tokio::test]
    async fn fetch_json_extracts_property() {
        let value = fetcher()
            .fetch_json(&RequestSpec::new("https://example.com/json"), Some("weather"))
            .await;
        assert_eq!(value, json!("sunny"));
    }

    #[tokio::test]
    async fn fetch_json_without_key_returns_whole_body() {
        let value = fetcher()
            .fetch_json(&RequestSpec::new("https://example.com/json"), None)
            .await;
        assert_eq!(value, json!({"weather": "sunny", "temperature": 25}));
    }

    #[tokio::test]
    async fn fetch_json_failures_become_null() {
        let f = fetcher();
        let spec = RequestSpec::new("https://example.com/error");
        assert_eq!(f.fetch_json(&spec, Some("weather")).await, Value::Null);

        let spec = RequestSpec::new("https://example.com/text");
        assert_eq!(f.fetch_json(&spec, None).await, Value::Null);
    }

    #[tokio::test]
    async fn execute_surfaces_typed_error() {
        let err = fetcher()
            .execute(&RequestSpec::new("https://example.com/error"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn loading_flag_untouched_without_activity() {
        let loading = LoadingFlag::new();
        let f = Fetcher::new(RouteTransport {
            flag: Some(loading.clone()),
            ..Default::default()
        });
        f.fetch(&RequestSpec::new("https://example.com/text")).await;
        assert_eq!(*f.transport().seen_loading.lock().unwrap(), vec![false]);
        assert!(!loading.is_loading());
    }

    #[tokio::test]
    async fn loading_flag_set_during_request_and_cleared_after() {
        let loading = LoadingFlag::new();
        let f = Fetcher::new(RouteTransport {
            flag: Some(loading.clone()),
            ..Default::default()
        })
        .with_loading_flag(&loading);

        f.fetch(&RequestSpec::new("https://example.com/text")).await;
        f.fetch(&RequestSpec::new("https://example.com/error")).await;
        f.fetch(&RequestSpec::new("https://example.com/offline")).await;

        assert_eq!(
            *f.transport().seen_loading.lock().unwrap(),
            vec![true, true, true]
        );
        assert!(!loading.is_loading());
        assert_eq!(loading.in_flight(), 0);
    }

    #[tokio::test]
    async fn callbacks_pair_even_for_invalid_target() {
        let busy = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(AtomicUsize::new(0));
        let (b, i) = (busy.clone(), idle.clone());
        let activity = Callbacks::new(
            move || {
                b.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                i.fetch_add(1, Ordering::SeqCst);
            },
        );
        let f = fetcher().with_activity(Arc::new(activity));

        f.fetch(&RequestSpec::new("")).await;
        f.fetch_json(&RequestSpec::new("https://example.com/json"), Some("weather"))
            .await;

        assert_eq!(busy.load(Ordering::SeqCst), 2);
        assert_eq!(idle.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_fetch_still_marks_idle() {
        let loading = LoadingFlag::new();
        let f = fetcher().with_loading_flag(&loading);
        let spec = RequestSpec::new("https://example.com/hang");

        let timed_out = tokio::time::timeout(Duration::from_millis(20), f.fetch(&spec)).await;
        assert!(timed_out.is_err());
        assert!(!loading.is_loading());
    }

    #[tokio::test]
    async fn fetchers_share_a_borrowed_transport() {
        let transport = RouteTransport::default();
        let text = Fetcher::new(&transport);
        let json = Fetcher::new(&transport);

        assert_eq!(text.fetch(&RequestSpec::new("https://example.com/text")).await, "Hello World!");
        assert_eq!(
            json.fetch_json(&RequestSpec::new("https://example.com/json"), Some("weather"))
                .await,
            json!("sunny")
        );
    }

    #[test]
    fn unpaired_idle_saturates_at_zero() {
        let loading = LoadingFlag::new();
        loading.mark_idle();
        assert_eq!(loading.in_flight(), 0);
        loading.mark_busy();
        loading.mark_busy();
        assert_eq!(loading.in_flight(), 2);
        loading.mark_idle();
        assert!(loading.is_loading());
    }
}
