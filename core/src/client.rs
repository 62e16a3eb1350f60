//! Request builders and top-level dispatch for the llama-server client.
//!
//! # Design
//! `LlamaClient` holds only the normalized base URL and carries no state
//! between calls. Each endpoint has a `build_*` method that deterministically
//! turns a prompt plus a parameter bag into a `JsonRequest` without touching
//! the network, so hosts can inspect requests or execute them through their
//! own stack. `process_request` strings a builder and the transport together
//! behind a boundary that never panics and never returns `Err`: callers
//! always get a `ResponseOutcome`.
//!
//! The mapping tables mirror llama-server's parameter surface field by
//! field. Bag keys that appear in no table are simply not sent.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{json, Value};
use tracing::debug;

use crate::endpoint::EndpointKind;
use crate::error::ClientError;
use crate::http::{JsonMap, JsonRequest, ResponseOutcome};
use crate::params::{clean_payload, decode_json_text, ParamBag, ParamValue};
use crate::transport::{self, DEFAULT_TIMEOUT_SECS};

/// Bag key to wire field for `/completion`. `stop_sequences` is the one
/// rename; everything else passes through under its own name.
const COMPLETION_FIELDS: &[(&str, &str)] = &[
    ("n_predict", "n_predict"),
    ("temperature", "temperature"),
    ("top_k", "top_k"),
    ("top_p", "top_p"),
    ("min_p", "min_p"),
    ("seed", "seed"),
    ("dynatemp_range", "dynatemp_range"),
    ("dynatemp_exponent", "dynatemp_exponent"),
    ("xtc_probability", "xtc_probability"),
    ("xtc_threshold", "xtc_threshold"),
    ("repeat_penalty", "repeat_penalty"),
    ("repeat_last_n", "repeat_last_n"),
    ("presence_penalty", "presence_penalty"),
    ("frequency_penalty", "frequency_penalty"),
    ("dry_multiplier", "dry_multiplier"),
    ("dry_base", "dry_base"),
    ("dry_allowed_length", "dry_allowed_length"),
    ("dry_penalty_last_n", "dry_penalty_last_n"),
    ("dry_sequence_breakers", "dry_sequence_breakers"),
    ("mirostat", "mirostat"),
    ("mirostat_tau", "mirostat_tau"),
    ("mirostat_eta", "mirostat_eta"),
    ("typical_p", "typical_p"),
    ("n_keep", "n_keep"),
    ("stop_sequences", "stop"),
    ("ignore_eos", "ignore_eos"),
    ("stream", "stream"),
    ("n_probs", "n_probs"),
    ("min_keep", "min_keep"),
    ("post_sampling_probs", "post_sampling_probs"),
    ("return_tokens", "return_tokens"),
    ("timings_per_token", "timings_per_token"),
    ("grammar", "grammar"),
    ("json_schema", "json_schema"),
    ("logit_bias", "logit_bias"),
    ("cache_prompt", "cache_prompt"),
    ("id_slot", "id_slot"),
    ("samplers", "samplers"),
    ("t_max_predict_ms", "t_max_predict_ms"),
    ("lora", "lora"),
    ("response_fields", "response_fields"),
    ("image_data", "image_data"),
];

/// Bag key to wire field for `/v1/chat/completions`. The OpenAI-compatible
/// route speaks `max_tokens` and `logprobs` instead of llama-server's
/// native names.
const CHAT_FIELDS: &[(&str, &str)] = &[
    ("max_tokens", "max_tokens"),
    ("temperature", "temperature"),
    ("top_p", "top_p"),
    ("top_k", "top_k"),
    ("min_p", "min_p"),
    ("seed", "seed"),
    ("stream", "stream"),
    ("stop_sequences", "stop"),
    ("presence_penalty", "presence_penalty"),
    ("frequency_penalty", "frequency_penalty"),
    ("tools", "tools"),
    ("tool_choice", "tool_choice"),
    ("response_format", "response_format"),
    ("n_probs", "logprobs"),
];

/// The completion-style parameters `/infill` accepts.
const INFILL_FIELDS: &[(&str, &str)] = &[
    ("temperature", "temperature"),
    ("top_k", "top_k"),
    ("top_p", "top_p"),
    ("min_p", "min_p"),
    ("seed", "seed"),
    ("stream", "stream"),
    ("n_predict", "n_predict"),
    ("stop_sequences", "stop"),
    ("repeat_penalty", "repeat_penalty"),
    ("repeat_last_n", "repeat_last_n"),
];

/// Synchronous, stateless client for llama-server's HTTP API.
///
/// Builds `JsonRequest` values per endpoint and, through `process_request`,
/// executes them and normalizes every outcome into a `ResponseOutcome`.
#[derive(Debug, Clone)]
pub struct LlamaClient {
    base_url: String,
}

impl LlamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: EndpointKind) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Native completion: prompt first, then every recognized sampling and
    /// generation field in table order.
    pub fn build_completion(&self, prompt: &str, params: &ParamBag) -> JsonRequest {
        let mut payload = JsonMap::new();
        payload.insert("prompt".to_string(), Value::from(prompt));
        copy_fields(params, COMPLETION_FIELDS, &mut payload);
        JsonRequest {
            url: self.url(EndpointKind::Completion),
            body: clean_payload(payload),
        }
    }

    /// OpenAI-compatible chat completion.
    ///
    /// The message list is assembled in a fixed order: decoded `messages`
    /// JSON, then `system_message`, `user_message` and `assistant_message`
    /// as single-role entries. When all of those are absent a non-empty
    /// prompt becomes a lone user message, so a bare prompt still chats.
    pub fn build_chat_completions(&self, prompt: &str, params: &ParamBag) -> JsonRequest {
        let mut messages = params
            .str("messages")
            .and_then(decode_json_text)
            .and_then(|decoded| match decoded {
                Value::Array(entries) => Some(entries),
                _ => None,
            })
            .unwrap_or_default();

        for (key, role) in [
            ("system_message", "system"),
            ("user_message", "user"),
            ("assistant_message", "assistant"),
        ] {
            if let Some(text) = params.str(key) {
                if !text.trim().is_empty() {
                    messages.push(json!({"role": role, "content": text}));
                }
            }
        }

        if messages.is_empty() && !prompt.is_empty() {
            messages.push(json!({"role": "user", "content": prompt}));
        }

        let mut payload = JsonMap::new();
        payload.insert("messages".to_string(), Value::Array(messages));
        payload.insert("model".to_string(), params.value_or("model", json!("default")));
        copy_fields(params, CHAT_FIELDS, &mut payload);
        JsonRequest {
            url: self.url(EndpointKind::ChatCompletions),
            body: clean_payload(payload),
        }
    }

    /// OpenAI-compatible embeddings. The input is the first non-empty of
    /// `input_text`, `content` and the prompt.
    pub fn build_embeddings(&self, prompt: &str, params: &ParamBag) -> JsonRequest {
        let input = ["input_text", "content"]
            .into_iter()
            .find_map(|key| params.str(key).filter(|text| !text.is_empty()))
            .unwrap_or(prompt);

        let mut payload = JsonMap::new();
        payload.insert("input".to_string(), Value::from(input));
        payload.insert("model".to_string(), params.value_or("model", json!("default")));
        payload.insert(
            "encoding_format".to_string(),
            params.value_or("encoding_format", json!("float")),
        );
        JsonRequest {
            url: self.url(EndpointKind::Embeddings),
            body: clean_payload(payload),
        }
    }

    /// Native tokenizer. `content` falls back to the prompt when empty.
    pub fn build_tokenize(&self, prompt: &str, params: &ParamBag) -> JsonRequest {
        let content = params
            .str("content")
            .filter(|text| !text.is_empty())
            .unwrap_or(prompt);

        let mut payload = JsonMap::new();
        payload.insert("content".to_string(), Value::from(content));
        payload.insert("add_special".to_string(), params.value_or("add_special", json!(false)));
        payload.insert(
            "parse_special".to_string(),
            params.value_or("parse_special", json!(true)),
        );
        payload.insert("with_pieces".to_string(), params.value_or("with_pieces", json!(false)));
        JsonRequest {
            url: self.url(EndpointKind::Tokenize),
            body: payload,
        }
    }

    /// Native detokenizer. `tokens` arrives as JSON text; undecodable input
    /// degrades to an empty list rather than an unsendable request.
    pub fn build_detokenize(&self, _prompt: &str, params: &ParamBag) -> JsonRequest {
        let mut payload = JsonMap::new();
        payload.insert("tokens".to_string(), decoded_or_empty(params, "tokens"));
        JsonRequest {
            url: self.url(EndpointKind::Detokenize),
            body: payload,
        }
    }

    /// Render the model's chat template over a message list without
    /// generating anything.
    pub fn build_apply_template(&self, _prompt: &str, params: &ParamBag) -> JsonRequest {
        let mut payload = JsonMap::new();
        payload.insert("messages".to_string(), decoded_or_empty(params, "messages"));
        JsonRequest {
            url: self.url(EndpointKind::ApplyTemplate),
            body: payload,
        }
    }

    /// Fill-in-the-middle completion around a prefix/suffix pair.
    pub fn build_infill(&self, prompt: &str, params: &ParamBag) -> JsonRequest {
        let mut payload = JsonMap::new();
        payload.insert(
            "input_prefix".to_string(),
            params.value_or("input_prefix", json!("")),
        );
        payload.insert(
            "input_suffix".to_string(),
            params.value_or("input_suffix", json!("")),
        );
        if let Some(text) = params.str("input_extra") {
            if let Some(decoded) = decode_json_text(text) {
                payload.insert("input_extra".to_string(), decoded);
            }
        }
        if !prompt.is_empty() {
            payload.insert("prompt".to_string(), Value::from(prompt));
        }
        copy_fields(params, INFILL_FIELDS, &mut payload);
        JsonRequest {
            url: self.url(EndpointKind::Infill),
            body: clean_payload(payload),
        }
    }

    /// Score documents against a query. `top_n` defaults to 10, matching
    /// the server's own cutoff.
    pub fn build_reranking(&self, _prompt: &str, params: &ParamBag) -> JsonRequest {
        let mut payload = JsonMap::new();
        payload.insert("model".to_string(), params.value_or("model", json!("default")));
        payload.insert("query".to_string(), params.value_or("query", json!("")));
        payload.insert("documents".to_string(), decoded_or_empty(params, "documents"));
        payload.insert("top_n".to_string(), params.value_or("top_n", json!(10)));
        JsonRequest {
            url: self.url(EndpointKind::Reranking),
            body: payload,
        }
    }

    /// Build the request for any endpoint kind without executing it.
    pub fn build_request(
        &self,
        endpoint: EndpointKind,
        prompt: &str,
        params: &ParamBag,
    ) -> JsonRequest {
        match endpoint {
            EndpointKind::Completion => self.build_completion(prompt, params),
            EndpointKind::ChatCompletions => self.build_chat_completions(prompt, params),
            EndpointKind::Embeddings => self.build_embeddings(prompt, params),
            EndpointKind::Tokenize => self.build_tokenize(prompt, params),
            EndpointKind::Detokenize => self.build_detokenize(prompt, params),
            EndpointKind::ApplyTemplate => self.build_apply_template(prompt, params),
            EndpointKind::Infill => self.build_infill(prompt, params),
            EndpointKind::Reranking => self.build_reranking(prompt, params),
        }
    }

    /// Resolve the endpoint selector, build the request, execute it and
    /// normalize whatever happens. Never panics, never returns `Err`.
    ///
    /// `api_key` and `timeout` ride in the bag rather than the payload:
    /// the key becomes a bearer header when non-empty, the timeout bounds
    /// the exchange and defaults to `DEFAULT_TIMEOUT_SECS`.
    pub fn process_request(&self, endpoint: &str, prompt: &str, params: &ParamBag) -> ResponseOutcome {
        let Some(kind) = EndpointKind::parse(endpoint) else {
            return ResponseOutcome::failure(ClientError::UnsupportedEndpoint(endpoint.to_string()));
        };

        let result = catch_unwind(AssertUnwindSafe(|| {
            let request = self.build_request(kind, prompt, params);
            let api_key = params.str("api_key").unwrap_or("");
            let timeout = params
                .int("timeout")
                .and_then(|secs| u64::try_from(secs).ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS);
            debug!("dispatching {kind} request to {}", request.url);
            transport::post_json(&request, api_key, timeout)
        }));

        match result {
            Ok(outcome) => outcome,
            Err(panic) => ResponseOutcome::failure(ClientError::Internal(panic_message(panic))),
        }
    }
}

/// Copy mapped bag values into the payload, in table order.
fn copy_fields(params: &ParamBag, table: &[(&str, &str)], payload: &mut JsonMap) {
    for &(bag_key, wire_key) in table {
        if let Some(value) = params.get(bag_key) {
            payload.insert(wire_key.to_string(), value.to_value());
        }
    }
}

/// Resolve a parameter that holds a JSON-encoded list: decode text (empty
/// list on failure), pass non-text values through, default absent to `[]`.
fn decoded_or_empty(params: &ParamBag, key: &str) -> Value {
    match params.get(key) {
        Some(ParamValue::Str(text)) => decode_json_text(text).unwrap_or_else(|| json!([])),
        Some(other) => other.to_value(),
        None => json!([]),
    }
}

/// Best-effort text out of a panic payload.
fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unexpected panic".to_string()
    }
}
