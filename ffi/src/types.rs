//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String` and opaque handles instead of Rust
//! structs. The outcome keeps all four fields as always-non-null C strings
//! (empty rather than null when a side is absent), so C callers can print
//! them without null checks. Conversion functions live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use llama_client_core::{JsonRequest, LlamaClient, ParamBag, ResponseOutcome};

/// Opaque handle to a `LlamaClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiLlamaClient {
    pub(crate) inner: LlamaClient,
}

/// Opaque handle to a parameter bag, filled through the `llama_params_set_*`
/// functions and passed to build/process calls.
pub struct FfiParamBag {
    pub(crate) inner: ParamBag,
}

/// Turn an owned string into a C string pointer, replacing interior NULs
/// with an empty string rather than failing.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// A built request exposed to C: absolute URL plus compact JSON body.
///
/// Built by `llama_build_request`. The C caller may execute it with any
/// HTTP stack; both fields are owned by this struct and freed together by
/// `llama_request_free`.
#[repr(C)]
pub struct FfiBuiltRequest {
    pub url: *mut c_char,
    pub body: *mut c_char,
}

impl FfiBuiltRequest {
    pub(crate) fn from_core(req: JsonRequest) -> *mut Self {
        let body = req.body_text();
        Box::into_raw(Box::new(FfiBuiltRequest {
            url: into_c_string(req.url),
            body: into_c_string(body),
        }))
    }
}

/// Normalized result of one processed request.
///
/// `response` is the parsed body re-serialized as compact JSON (empty when
/// no parseable body arrived), `raw_response` the pretty-printed or raw
/// server text, `error` the failure message (empty on success) and
/// `status_code` the HTTP or taxonomy status. All three strings are
/// non-null; free the whole struct with `llama_outcome_free`.
#[repr(C)]
pub struct FfiOutcome {
    pub response: *mut c_char,
    pub raw_response: *mut c_char,
    pub error: *mut c_char,
    pub status_code: u16,
}

impl FfiOutcome {
    pub(crate) fn from_core(outcome: ResponseOutcome) -> *mut Self {
        let response = outcome
            .body
            .map(|body| body.to_string())
            .unwrap_or_default();
        Box::into_raw(Box::new(FfiOutcome {
            response: into_c_string(response),
            raw_response: into_c_string(outcome.raw),
            error: into_c_string(outcome.error),
            status_code: outcome.status,
        }))
    }

    /// Outcome for failures that happen before the core pipeline runs
    /// (null arguments, panics at the boundary).
    pub(crate) fn boundary_error(detail: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiOutcome {
            response: into_c_string(String::new()),
            raw_response: into_c_string(String::new()),
            error: into_c_string(format!("Error processing request: {detail}")),
            status_code: 500,
        }))
    }
}
