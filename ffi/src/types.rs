//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CStr, CString};
use std::str::Utf8Error;
use std::os::raw::c_char;

use fetch_core::{FetchError, HttpRequest, HttpResponse, LoadingFlag, Normalizer, ResponseOutcome};
use serde_json::Value;

/// Opaque handle to a `Normalizer`.
pub struct FfiNormalizer {
    pub(crate) inner: Normalizer,
}

/// Opaque handle to a shared `LoadingFlag` (the `fetchLoading` value).
pub struct FfiLoadingFlag {
    pub(crate) inner: LoadingFlag,
}

/// Copy a Rust string into a heap C string. A string with an interior NUL
/// becomes empty rather than panicking.
pub(crate) fn to_c_string<S: Into<Vec<u8>>>(s: S) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Borrow a C string as UTF-8. Null or invalid UTF-8 yields `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn from_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Borrow an optional C string. Null is `Ok(None)`; bytes that are not UTF-8
/// are an error rather than being mistaken for an absent argument.
///
/// # Safety
/// Same as `from_c_str`.
pub(crate) unsafe fn opt_c_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, Utf8Error> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map(Some)
}

/// Copy a C string, replacing invalid UTF-8 with U+FFFD. Null reads as `""`.
///
/// # Safety
/// Same as `from_c_str`.
pub(crate) unsafe fn lossy_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A caller-provided header. Read, never freed, by this library.
#[repr(C)]
pub struct FfiHeaderRef {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// A header owned by an `FfiHttpRequest`.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// `method` is the upper-cased verb, passed through even when unknown.
/// `body` is null when no body should be sent.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: *mut c_char,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: to_c_string(req.method.as_str()),
            url: to_c_string(req.url),
            headers,
            headers_len,
            body: req.body.map(to_c_string).unwrap_or(std::ptr::null_mut()),
        }))
    }

    /// Release a request produced by `from_core`.
    ///
    /// # Safety
    /// `req` must come from `from_core` and not have been freed already.
    pub(crate) unsafe fn free(req: *mut Self) {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.method);
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize);
            let headers = unsafe { Box::from_raw(slice) };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    }
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller fills this in after executing the request. `status_text` and
/// `body` may be null; they are read as empty strings. Bytes that are not
/// UTF-8 are replaced with U+FFFD, as `reqwest`'s `text()` does.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub status_text: *const c_char,
    pub body: *const c_char,
}

impl FfiHttpResponse {
    pub(crate) fn to_core(&self) -> HttpResponse {
        let status_text = unsafe { lossy_c_str(self.status_text) };
        let body = unsafe { lossy_c_str(self.body) };
        HttpResponse::new(self.status, status_text, body)
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiFetchResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidTarget = 1,
    Transport = 2,
    Http = 3,
    Parse = 4,
    Serialization = 5,
    Panic = 6,
    NullArg = 7,
    InvalidArg = 8,
}

/// Tag that tells `fx_free_result` what `FfiFetchResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a C string holding the raw body.
    Text = 1,
    /// `data` is a C string holding a JSON document (`null` for absent keys).
    Json = 2,
    /// `data` is an `FfiHttpRequest`.
    Request = 3,
}

/// Result envelope for build and parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag`. On failure `error_code`
/// describes the category, `error_message` is a human-readable C string,
/// `http_status` is set for `Http` errors, and `data` is null.
#[repr(C)]
pub struct FfiFetchResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiFetchResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiFetchResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn failure(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiFetchResult {
            error_code,
            error_message: to_c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_request(req: HttpRequest) -> *mut Self {
        Self::ok(FfiDataTag::Request, FfiHttpRequest::from_core(req) as *mut c_void)
    }

    pub(crate) fn ok_outcome(outcome: ResponseOutcome) -> *mut Self {
        match outcome {
            ResponseOutcome::Text(text) => Self::ok(FfiDataTag::Text, to_c_string(text) as *mut c_void),
            ResponseOutcome::Json(value) => Self::ok_json(value),
        }
    }

    pub(crate) fn ok_json(value: Value) -> *mut Self {
        Self::ok(FfiDataTag::Json, to_c_string(value.to_string()) as *mut c_void)
    }

    pub(crate) fn from_error(err: FetchError) -> *mut Self {
        let code = match &err {
            FetchError::InvalidTarget => FfiErrorCode::InvalidTarget,
            FetchError::Transport(_) => FfiErrorCode::Transport,
            FetchError::Http { .. } => FfiErrorCode::Http,
            FetchError::Parse(_) => FfiErrorCode::Parse,
            FetchError::Serialization(_) => FfiErrorCode::Serialization,
        };
        Self::failure(code, err.status().unwrap_or(0), err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_utf8(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidArg, 0, format!("invalid UTF-8: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, 0, msg.to_string())
    }

    /// Borrow the payload string of a `Text` or `Json` result.
    pub(crate) fn payload_str(&self) -> Option<&str> {
        match self.data_tag {
            FfiDataTag::Text | FfiDataTag::Json if self.error_code == FfiErrorCode::Ok => unsafe {
                from_c_str(self.data as *const c_char)
            },
            _ => None,
        }
    }
}
