//! Blocking HTTP transport for built requests.
//!
//! # Design
//! One agent per call: the timeout is caller-supplied per request and no
//! connection reuse is promised, so there is nothing worth caching. The
//! agent is configured with `http_status_as_error(false)`, so 4xx/5xx
//! responses are data here and status interpretation belongs to the
//! caller. Every failure mode collapses into a `ResponseOutcome` through
//! the `ClientError` taxonomy; this function does not return `Err`.

use std::io;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::http::{JsonRequest, ResponseOutcome};

/// Timeout applied when the caller does not supply one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Execute one POST with a JSON body and normalize the result.
///
/// `api_key`, when non-empty, is sent as a bearer token. `timeout_secs`
/// bounds the whole exchange; expiry yields the timeout outcome rather
/// than blocking indefinitely.
pub fn post_json(request: &JsonRequest, api_key: &str, timeout_secs: u64) -> ResponseOutcome {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build()
        .new_agent();

    let body = request.body_text();
    debug!("POST {} ({} bytes)", request.url, body.len());

    let mut builder = agent
        .post(&request.url)
        .content_type("application/json");
    if !api_key.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {api_key}"));
    }

    let mut response = match builder.send(body.as_bytes()) {
        Ok(response) => response,
        Err(err) => {
            let err = classify(err);
            warn!("request to {} failed: {err}", request.url);
            return ResponseOutcome::failure(err);
        }
    };

    let status = response.status().as_u16();
    let text = match response.body_mut().read_to_string() {
        Ok(text) => text,
        Err(err) => {
            let err = classify(err);
            warn!("reading response from {} failed: {err}", request.url);
            return ResponseOutcome::failure(err);
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(parsed) => ResponseOutcome::success(parsed, status),
        Err(_) => ResponseOutcome::failure(ClientError::MalformedResponse { raw: text }),
    }
}

/// Map a ureq failure onto the outcome taxonomy.
fn classify(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Timeout(_) => ClientError::Timeout,
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => ClientError::ConnectionFailed,
        ureq::Error::Io(io) => classify_io(io),
        other => ClientError::Transport(other.to_string()),
    }
}

fn classify_io(err: io::Error) -> ClientError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ClientError::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => ClientError::ConnectionFailed,
        _ => ClientError::Transport(err.to_string()),
    }
}
