//! C-ABI registration surface for `fetch-core`.
//!
//! # Overview
//! Lets a host with a C FFI register `fetch`, `fetchjson` and `fetchLoading`
//! without linking an async runtime. The host performs the HTTP round-trip
//! itself: it asks this library to build the request, executes it, and hands
//! the response back to be normalized.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Build and parse return one `FfiFetchResult` envelope with
//!   `FfiDataTag` + `void* data`, carrying payloads and typed errors alike.
//! - Fallback values (`""`, `null`) are produced only by the
//!   `fx_result_*_or_*` helpers, never by build or parse.
//! - The C caller owns all returned pointers and must release them with the
//!   matching `fx_*_free` / `fx_free_*` function.

pub mod types;

use std::os::raw::c_char;
use std::panic::catch_unwind;

use fetch_core::{Activity, HttpRequest, RequestSpec, ResponseOutcome, TransportError};
use serde_json::Value;

use types::*;

// ---------------------------------------------------------------------------
// Template names
// ---------------------------------------------------------------------------

/// The names under which the host registers the three template helpers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTemplateName {
    Fetch = 0,
    FetchJson = 1,
    FetchLoading = 2,
}

/// Static, NUL-terminated name for `which`. Never freed.
#[unsafe(no_mangle)]
pub extern "C" fn fx_template_name(which: FfiTemplateName) -> *const c_char {
    match which {
        FfiTemplateName::Fetch => c"fetch".as_ptr(),
        FfiTemplateName::FetchJson => c"fetchjson".as_ptr(),
        FfiTemplateName::FetchLoading => c"fetchLoading".as_ptr(),
    }
}

// ---------------------------------------------------------------------------
// Normalizer lifecycle
// ---------------------------------------------------------------------------

/// Create a normalizer with the default `Content-Type: application/json`
/// header. The caller must free it with `fx_normalizer_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_normalizer_new() -> *mut FfiNormalizer {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiNormalizer {
            inner: fetch_core::Normalizer::new(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Add or replace a default header. Returns false on null or non-UTF-8 input.
#[unsafe(no_mangle)]
pub extern "C" fn fx_normalizer_set_default_header(
    normalizer: *mut FfiNormalizer,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    catch_unwind(|| {
        if normalizer.is_null() {
            return false;
        }
        let (Some(name), Some(value)) = (unsafe { from_c_str(name) }, unsafe { from_c_str(value) })
        else {
            return false;
        };
        let normalizer = unsafe { &mut *normalizer };
        normalizer.inner = std::mem::take(&mut normalizer.inner).with_default_header(name, value);
        true
    })
    .unwrap_or(false)
}

/// Free a normalizer created by `fx_normalizer_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fx_normalizer_free(normalizer: *mut FfiNormalizer) {
    if !normalizer.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(normalizer) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Borrow an optional string argument, rejecting bytes that are not UTF-8.
unsafe fn optional_arg<'a>(
    ptr: *const c_char,
    name: &str,
) -> Result<Option<&'a str>, *mut FfiFetchResult> {
    unsafe { opt_c_str(ptr) }.map_err(|_| FfiFetchResult::invalid_utf8(name))
}

/// Read `len` caller headers. Every key and value must be non-null UTF-8.
fn read_headers(
    headers: *const FfiHeaderRef,
    len: u32,
) -> Result<Vec<(String, String)>, *mut FfiFetchResult> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if headers.is_null() {
        return Err(FfiFetchResult::null_arg("headers"));
    }
    let required = |ptr: *const c_char| -> Result<String, *mut FfiFetchResult> {
        unsafe { optional_arg(ptr, "headers") }?
            .map(str::to_string)
            .ok_or_else(|| FfiFetchResult::null_arg("headers"))
    };
    let raw = unsafe { std::slice::from_raw_parts(headers, len as usize) };
    raw.iter()
        .map(|h| -> Result<(String, String), *mut FfiFetchResult> {
            Ok((required(h.key)?, required(h.value)?))
        })
        .collect()
}

fn build_request(
    normalizer: *const FfiNormalizer,
    target: *const c_char,
    method: *const c_char,
    headers: *const FfiHeaderRef,
    headers_len: u32,
    body: *const c_char,
) -> Result<HttpRequest, *mut FfiFetchResult> {
    if normalizer.is_null() {
        return Err(FfiFetchResult::null_arg("normalizer"));
    }
    let normalizer = unsafe { &*normalizer };
    let headers = read_headers(headers, headers_len)?;

    let target = unsafe { optional_arg(target, "target") }?.unwrap_or("");
    let mut spec = RequestSpec::new(target).headers(headers);
    if let Some(method) = unsafe { optional_arg(method, "method") }? {
        spec = spec.method(method);
    }
    if let Some(body) = unsafe { optional_arg(body, "body") }? {
        spec = spec.body(body);
    }

    normalizer
        .inner
        .build_request(&spec)
        .map_err(FfiFetchResult::from_error)
}

/// Build the HTTP request for one fetch.
///
/// `method` may be null (GET). `headers` may be null when `headers_len` is 0.
/// `body` may be null; otherwise it is sent verbatim for POST, PUT and PATCH
/// and ignored for other methods. A null or empty `target` yields an
/// `InvalidTarget` result, and any string argument that is not UTF-8 yields
/// `InvalidArg`. On success `data_tag = Request`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_build_request(
    normalizer: *const FfiNormalizer,
    target: *const c_char,
    method: *const c_char,
    headers: *const FfiHeaderRef,
    headers_len: u32,
    body: *const c_char,
) -> *mut FfiFetchResult {
    catch_unwind(|| {
        match build_request(normalizer, target, method, headers, headers_len, body) {
            Ok(req) => FfiFetchResult::ok_request(req),
            Err(result) => result,
        }
    })
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fx_build_request"))
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Normalize a response for `fetch`: the body text on success
/// (`data_tag = Text`).
#[unsafe(no_mangle)]
pub extern "C" fn fx_parse_text(
    normalizer: *const FfiNormalizer,
    response: *const FfiHttpResponse,
) -> *mut FfiFetchResult {
    catch_unwind(|| {
        if normalizer.is_null() {
            return FfiFetchResult::null_arg("normalizer");
        }
        if response.is_null() {
            return FfiFetchResult::null_arg("response");
        }
        let normalizer = unsafe { &*normalizer };
        let response = unsafe { &*response }.to_core();
        match normalizer.inner.normalize(response, None) {
            Ok(outcome) => FfiFetchResult::ok_outcome(outcome),
            Err(e) => FfiFetchResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fx_parse_text"))
}

/// Normalize a response for `fetchjson` (`data_tag = Json`).
///
/// With a `key`, `data` is that property's JSON (`null` when absent). With a
/// null `key`, `data` is the whole body, which must then be valid JSON. A
/// `key` that is not UTF-8 yields `InvalidArg`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_parse_json(
    normalizer: *const FfiNormalizer,
    response: *const FfiHttpResponse,
    key: *const c_char,
) -> *mut FfiFetchResult {
    catch_unwind(|| {
        if normalizer.is_null() {
            return FfiFetchResult::null_arg("normalizer");
        }
        if response.is_null() {
            return FfiFetchResult::null_arg("response");
        }
        let normalizer = unsafe { &*normalizer };
        let response = unsafe { &*response }.to_core();
        let key = match unsafe { optional_arg(key, "key") } {
            Ok(key) => key,
            Err(result) => return result,
        };
        match normalizer
            .inner
            .normalize(response, key)
            .and_then(ResponseOutcome::into_json)
        {
            Ok(value) => FfiFetchResult::ok_json(value),
            Err(e) => FfiFetchResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fx_parse_json"))
}

/// Report that the host could not complete the request for `target`
/// (offline, DNS, aborted). Returns a `Transport` failure envelope.
#[unsafe(no_mangle)]
pub extern "C" fn fx_transport_failed(
    normalizer: *const FfiNormalizer,
    target: *const c_char,
    message: *const c_char,
) -> *mut FfiFetchResult {
    catch_unwind(|| {
        if normalizer.is_null() {
            return FfiFetchResult::null_arg("normalizer");
        }
        let normalizer = unsafe { &*normalizer };
        let target = unsafe { lossy_c_str(target) };
        let message = if message.is_null() {
            "transport failed".to_string()
        } else {
            unsafe { lossy_c_str(message) }
        };
        let err = normalizer
            .inner
            .transport_failure(&target, TransportError::new(message));
        FfiFetchResult::from_error(err)
    })
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in fx_transport_failed"))
}

// ---------------------------------------------------------------------------
// Boundary fallbacks
// ---------------------------------------------------------------------------

/// The `fetch` view of a result: its text, or `""` for any failure.
/// The caller frees the returned string with `fx_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_result_text_or_empty(result: *const FfiFetchResult) -> *mut c_char {
    catch_unwind(|| {
        if result.is_null() {
            return to_c_string("");
        }
        let result = unsafe { &*result };
        let text = match (result.data_tag, result.payload_str()) {
            (FfiDataTag::Text, Some(text)) => text.to_string(),
            (FfiDataTag::Json, Some(json)) => serde_json::from_str::<Value>(json)
                .map(|v| ResponseOutcome::Json(v).into_text())
                .unwrap_or_default(),
            _ => String::new(),
        };
        to_c_string(text)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// The `fetchjson` view of a result: JSON text, or `null` for any failure.
/// A `Text` result is parsed as a whole document. The caller frees the
/// returned string with `fx_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_result_json_or_null(result: *const FfiFetchResult) -> *mut c_char {
    catch_unwind(|| {
        if result.is_null() {
            return to_c_string("null");
        }
        let result = unsafe { &*result };
        let json = match (result.data_tag, result.payload_str()) {
            (FfiDataTag::Json, Some(json)) => json.to_string(),
            (FfiDataTag::Text, Some(text)) => ResponseOutcome::Text(text.to_string())
                .into_json()
                .unwrap_or(Value::Null)
                .to_string(),
            _ => Value::Null.to_string(),
        };
        to_c_string(json)
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Loading flag
// ---------------------------------------------------------------------------

/// Create the shared `fetchLoading` flag. Free with `fx_loading_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_loading_new() -> *mut FfiLoadingFlag {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiLoadingFlag {
            inner: fetch_core::LoadingFlag::new(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Mark one request as started. Pair every call with `fx_loading_mark_idle`.
#[unsafe(no_mangle)]
pub extern "C" fn fx_loading_mark_busy(flag: *const FfiLoadingFlag) {
    if !flag.is_null() {
        let _ = catch_unwind(|| unsafe { &*flag }.inner.mark_busy());
    }
}

/// Mark one request as finished, successfully or not.
#[unsafe(no_mangle)]
pub extern "C" fn fx_loading_mark_idle(flag: *const FfiLoadingFlag) {
    if !flag.is_null() {
        let _ = catch_unwind(|| unsafe { &*flag }.inner.mark_idle());
    }
}

/// True while at least one request is in flight. False for null.
#[unsafe(no_mangle)]
pub extern "C" fn fx_loading_is_loading(flag: *const FfiLoadingFlag) -> bool {
    if flag.is_null() {
        return false;
    }
    catch_unwind(|| unsafe { &*flag }.inner.is_loading()).unwrap_or(false)
}

/// Free a flag created by `fx_loading_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fx_loading_free(flag: *mut FfiLoadingFlag) {
    if !flag.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(flag) });
        });
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiFetchResult` returned by any build or parse function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn fx_free_result(result: *mut FfiFetchResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Text | FfiDataTag::Json => free_c_string(result.data as *mut c_char),
                FfiDataTag::Request => unsafe {
                    FfiHttpRequest::free(result.data as *mut FfiHttpRequest)
                },
                FfiDataTag::None => {}
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fx_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
