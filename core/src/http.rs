//! Plain-data request and outcome types.
//!
//! # Design
//! A built request is just a URL plus a JSON body: owned data the host can
//! inspect, serialize, or execute itself without this crate's transport.
//! The outcome mirrors the four fields hosts consume (parsed body, raw text,
//! error message, status code); which side is meaningful is signalled by
//! `error` being empty, never by absence of fields.
//!
//! All fields use owned types so values can cross the FFI boundary without
//! lifetime concerns.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Insertion-ordered JSON object used for request payloads.
pub type JsonMap = Map<String, Value>;

/// A fully built POST request: absolute URL plus JSON payload.
///
/// Built by `LlamaClient::build_*` methods. `transport::post_json` executes
/// it, or the host can serialize `body` and send it through its own stack.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRequest {
    pub url: String,
    pub body: JsonMap,
}

impl JsonRequest {
    /// The payload as compact JSON text, ready to send.
    pub fn body_text(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_default()
    }
}

/// Normalized result of one request, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseOutcome {
    /// Parsed response body; `None` when no parseable body arrived.
    pub body: Option<Value>,
    /// Pretty-printed response JSON on success; on a malformed-response
    /// failure the raw text the server sent; otherwise empty.
    pub raw: String,
    /// Empty on success. HTTP 4xx/5xx statuses with JSON bodies count as
    /// success here; the status code carries the bad news.
    pub error: String,
    /// HTTP status verbatim on success, taxonomy code on failure.
    pub status: u16,
}

impl ResponseOutcome {
    /// Successful exchange: the body parsed, whatever the status says.
    pub fn success(body: Value, status: u16) -> Self {
        let raw = serde_json::to_string_pretty(&body).unwrap_or_default();
        ResponseOutcome {
            body: Some(body),
            raw,
            error: String::new(),
            status,
        }
    }

    /// Failed exchange, classified by `error`.
    pub fn failure(error: ClientError) -> Self {
        let status = error.status();
        let raw = match &error {
            ClientError::MalformedResponse { raw } => raw.clone(),
            _ => String::new(),
        };
        ResponseOutcome {
            body: None,
            raw,
            error: error.to_string(),
            status,
        }
    }

    /// True when the pipeline itself failed. HTTP-level errors from the
    /// server must be detected via `status` instead.
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}
