//! C-ABI wrapper around `llama-client-core`.
//!
//! # Overview
//! Exposes the llama-server client to any language with a C FFI: create a
//! client, fill a parameter bag, then either build a request to execute
//! elsewhere or process it end to end and read the four-field outcome.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `llama_process_request` never returns null: argument problems and
//!   caught panics come back as an outcome with the error field set.
//! - The C caller owns all returned pointers and must call the matching
//!   `llama_*_free` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use llama_client_core::{EndpointKind, LlamaClient, ParamBag};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `llama_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn llama_client_new(base_url: *const c_char) -> *mut FfiLlamaClient {
    catch_unwind(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = unsafe { CStr::from_ptr(base_url) }.to_str().unwrap_or("");
        let client = LlamaClient::new(url);
        Box::into_raw(Box::new(FfiLlamaClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `llama_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_client_free(client: *mut FfiLlamaClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Parameter bag
// ---------------------------------------------------------------------------

/// Create an empty parameter bag.
///
/// The caller must free the returned pointer with `llama_params_free`.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_new() -> *mut FfiParamBag {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiParamBag {
            inner: ParamBag::new(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a parameter bag created by `llama_params_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_free(params: *mut FfiParamBag) {
    if !params.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(params) });
        });
    }
}

/// Set a string-valued parameter. Setting an existing key replaces it.
/// Returns false if any pointer is null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_set_str(
    params: *mut FfiParamBag,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    catch_unwind(|| {
        if params.is_null() || key.is_null() || value.is_null() {
            return false;
        }
        let bag = unsafe { &mut *params };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap_or("");
        let value = unsafe { CStr::from_ptr(value) }.to_str().unwrap_or("").to_string();
        bag.inner.set(key, value);
        true
    })
    .unwrap_or(false)
}

/// Set an integer-valued parameter. Returns false if any pointer is null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_set_int(
    params: *mut FfiParamBag,
    key: *const c_char,
    value: i64,
) -> bool {
    catch_unwind(|| {
        if params.is_null() || key.is_null() {
            return false;
        }
        let bag = unsafe { &mut *params };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap_or("");
        bag.inner.set(key, value);
        true
    })
    .unwrap_or(false)
}

/// Set a float-valued parameter. Returns false if any pointer is null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_set_float(
    params: *mut FfiParamBag,
    key: *const c_char,
    value: f64,
) -> bool {
    catch_unwind(|| {
        if params.is_null() || key.is_null() {
            return false;
        }
        let bag = unsafe { &mut *params };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap_or("");
        bag.inner.set(key, value);
        true
    })
    .unwrap_or(false)
}

/// Set a boolean-valued parameter. Returns false if any pointer is null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_set_bool(
    params: *mut FfiParamBag,
    key: *const c_char,
    value: bool,
) -> bool {
    catch_unwind(|| {
        if params.is_null() || key.is_null() {
            return false;
        }
        let bag = unsafe { &mut *params };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap_or("");
        bag.inner.set(key, value);
        true
    })
    .unwrap_or(false)
}

/// Set an already-structured parameter from JSON text (an array, object,
/// or any other JSON value). Returns false if any pointer is null or the
/// text is not valid JSON.
#[unsafe(no_mangle)]
pub extern "C" fn llama_params_set_json(
    params: *mut FfiParamBag,
    key: *const c_char,
    json_text: *const c_char,
) -> bool {
    catch_unwind(|| {
        if params.is_null() || key.is_null() || json_text.is_null() {
            return false;
        }
        let bag = unsafe { &mut *params };
        let key = unsafe { CStr::from_ptr(key) }.to_str().unwrap_or("");
        let text = unsafe { CStr::from_ptr(json_text) }.to_str().unwrap_or("");
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => {
                bag.inner.set(key, value);
                true
            }
            Err(_) => false,
        }
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Build and process
// ---------------------------------------------------------------------------

/// Build the request for an endpoint without executing it.
///
/// `prompt` may be null (treated as empty) and `params` may be null
/// (treated as an empty bag). Returns null if `client` or `endpoint` is
/// null or the endpoint selector is not recognized. The caller must free
/// the returned pointer with `llama_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn llama_build_request(
    client: *const FfiLlamaClient,
    endpoint: *const c_char,
    prompt: *const c_char,
    params: *const FfiParamBag,
) -> *mut FfiBuiltRequest {
    catch_unwind(|| {
        if client.is_null() || endpoint.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let endpoint = unsafe { CStr::from_ptr(endpoint) }.to_str().unwrap_or("");
        let Some(kind) = EndpointKind::parse(endpoint) else {
            return std::ptr::null_mut();
        };
        let prompt = if prompt.is_null() {
            ""
        } else {
            unsafe { CStr::from_ptr(prompt) }.to_str().unwrap_or("")
        };
        let empty = ParamBag::new();
        let bag = if params.is_null() {
            &empty
        } else {
            &unsafe { &*params }.inner
        };
        FfiBuiltRequest::from_core(client.inner.build_request(kind, prompt, bag))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build, execute and normalize one request. Never returns null: argument
/// problems and caught panics come back as an outcome with `error` set and
/// status 500, unsupported endpoints as the usual 400 outcome.
///
/// `prompt` may be null (treated as empty) and `params` may be null
/// (treated as an empty bag). The caller must free the returned pointer
/// with `llama_outcome_free`.
#[unsafe(no_mangle)]
pub extern "C" fn llama_process_request(
    client: *const FfiLlamaClient,
    endpoint: *const c_char,
    prompt: *const c_char,
    params: *const FfiParamBag,
) -> *mut FfiOutcome {
    catch_unwind(|| {
        if client.is_null() {
            return FfiOutcome::boundary_error("null argument: client");
        }
        if endpoint.is_null() {
            return FfiOutcome::boundary_error("null argument: endpoint");
        }
        let client = unsafe { &*client };
        let endpoint = unsafe { CStr::from_ptr(endpoint) }.to_str().unwrap_or("");
        let prompt = if prompt.is_null() {
            ""
        } else {
            unsafe { CStr::from_ptr(prompt) }.to_str().unwrap_or("")
        };
        let empty = ParamBag::new();
        let bag = if params.is_null() {
            &empty
        } else {
            &unsafe { &*params }.inner
        };
        FfiOutcome::from_core(client.inner.process_request(endpoint, prompt, bag))
    })
    .unwrap_or_else(|_| FfiOutcome::boundary_error("panic in llama_process_request"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a request returned by `llama_build_request`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_request_free(req: *mut FfiBuiltRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
    });
}

/// Free an outcome returned by `llama_process_request`. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn llama_outcome_free(outcome: *mut FfiOutcome) {
    if outcome.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let outcome = unsafe { Box::from_raw(outcome) };
        if !outcome.response.is_null() {
            drop(unsafe { CString::from_raw(outcome.response) });
        }
        if !outcome.raw_response.is_null() {
            drop(unsafe { CString::from_raw(outcome.raw_response) });
        }
        if !outcome.error.is_null() {
            drop(unsafe { CString::from_raw(outcome.error) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
