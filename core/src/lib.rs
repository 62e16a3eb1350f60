//! Synchronous client for llama.cpp's `llama-server` HTTP API.
//!
//! # Overview
//! Turns one flat bag of typed generation parameters plus an endpoint
//! selector into the endpoint-specific JSON request, performs a single
//! blocking POST, and normalizes every outcome (success, transport failure,
//! malformed response, panic) into one four-field `ResponseOutcome`. Built
//! to sit inside a node-graph host as a single pipeline step.
//!
//! # Design
//! - `LlamaClient` is stateless; it holds only the normalized base URL.
//! - Request building is pure: `build_request` and the `build_*` methods
//!   never touch the network, so hosts can inspect requests or execute
//!   them through their own stack.
//! - The transport runs one bounded blocking exchange per call; outcomes
//!   are always data, never panics or `Err`s.
//! - JSON-bearing string parameters decode with silent-skip semantics; the
//!   server stays the authority on validity.
//! - Types use owned `String` / `Vec` fields to simplify the FFI mapping.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod params;
pub mod transport;

pub use client::LlamaClient;
pub use endpoint::EndpointKind;
pub use error::ClientError;
pub use http::{JsonMap, JsonRequest, ResponseOutcome};
pub use params::{clean_payload, ParamBag, ParamValue};
pub use transport::{post_json, DEFAULT_TIMEOUT_SECS};
