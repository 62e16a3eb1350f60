use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub fn app() -> Router {
    Router::new()
        .route("/completion", post(completion))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/embeddings", post(embeddings))
        .route("/tokenize", post(tokenize))
        .route("/detokenize", post(detokenize))
        .route("/apply-template", post(apply_template))
        .route("/infill", post(infill))
        .route("/v1/rerank", post(rerank))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// llama-server wraps every failure in the same envelope.
fn error_body(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
                "type": "invalid_request_error",
            }
        })),
    )
}

fn model_of(body: &Value) -> Value {
    body.get("model").cloned().unwrap_or_else(|| json!("mock-llama"))
}

/// Rejects the stringly-typed stop lists a sloppy client would send.
fn check_stop_field(body: &Value) -> Option<(StatusCode, Json<Value>)> {
    match body.get("stop") {
        Some(stop) if !stop.is_array() => Some(error_body(
            StatusCode::BAD_REQUEST,
            "\"stop\" must be an array of strings",
        )),
        _ => None,
    }
}

async fn completion(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let Some(prompt) = body.get("prompt").and_then(Value::as_str) else {
        return error_body(StatusCode::BAD_REQUEST, "\"prompt\" must be provided");
    };
    if let Some(rejection) = check_stop_field(&body) {
        return rejection;
    }

    let content = format!("{prompt} and the mock continues.");
    let evaluated = prompt.split_whitespace().count();
    let predicted = content.split_whitespace().count();
    let prompt = prompt.to_string();
    (
        StatusCode::OK,
        Json(json!({
            "content": content,
            "tokens_predicted": predicted,
            "tokens_evaluated": evaluated,
            "stop": true,
            "stop_type": "eos",
            "model": model_of(&body),
            "prompt": prompt,
            "generation_settings": body,
        })),
    )
}

async fn chat_completions(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return error_body(StatusCode::BAD_REQUEST, "\"messages\" must be an array");
    };
    if messages.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "\"messages\" must not be empty");
    }

    let last = messages
        .last()
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let reply = format!("echo: {last}");
    let completion_tokens = reply.split_whitespace().count();
    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-mock-1",
            "object": "chat.completion",
            "created": 0,
            "model": model_of(&body),
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": reply},
            }],
            "usage": {
                "prompt_tokens": messages.len(),
                "completion_tokens": completion_tokens,
                "total_tokens": messages.len() + completion_tokens,
            },
        })),
    )
}

async fn embeddings(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let inputs: Vec<String> = match body.get("input") {
        Some(Value::String(text)) => vec![text.clone()],
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| entry.as_str().unwrap_or("").to_string())
            .collect(),
        _ => return error_body(StatusCode::BAD_REQUEST, "\"input\" must be provided"),
    };

    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(index, text)| {
            json!({
                "object": "embedding",
                "embedding": embedding_for(text),
                "index": index,
            })
        })
        .collect();
    let prompt_tokens: usize = inputs.iter().map(|text| text.split_whitespace().count()).sum();
    (
        StatusCode::OK,
        Json(json!({
            "object": "list",
            "data": data,
            "model": model_of(&body),
            "usage": {"prompt_tokens": prompt_tokens, "total_tokens": prompt_tokens},
        })),
    )
}

async fn tokenize(Json(body): Json<Value>) -> Json<Value> {
    let content = body.get("content").and_then(Value::as_str).unwrap_or("");
    let add_special = body.get("add_special").and_then(Value::as_bool).unwrap_or(false);
    let with_pieces = body.get("with_pieces").and_then(Value::as_bool).unwrap_or(false);

    let mut pieces: Vec<(i64, String)> = content
        .split_whitespace()
        .map(|word| (token_id(word), word.to_string()))
        .collect();
    if add_special {
        pieces.insert(0, (BOS_ID, "<s>".to_string()));
    }

    let tokens: Vec<Value> = if with_pieces {
        pieces
            .iter()
            .map(|(id, piece)| json!({"id": id, "piece": piece}))
            .collect()
    } else {
        pieces.iter().map(|(id, _)| json!(id)).collect()
    };
    Json(json!({"tokens": tokens}))
}

async fn detokenize(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let Some(tokens) = body.get("tokens").and_then(Value::as_array) else {
        return error_body(StatusCode::BAD_REQUEST, "\"tokens\" must be an array");
    };
    let content = tokens
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    (StatusCode::OK, Json(json!({"content": content})))
}

async fn apply_template(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return error_body(StatusCode::BAD_REQUEST, "\"messages\" must be an array");
    };
    (StatusCode::OK, Json(json!({"prompt": render_template(messages)})))
}

async fn infill(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let prefix = body.get("input_prefix").and_then(Value::as_str);
    let suffix = body.get("input_suffix").and_then(Value::as_str);
    let (Some(prefix), Some(suffix)) = (prefix, suffix) else {
        return error_body(
            StatusCode::BAD_REQUEST,
            "\"input_prefix\" and \"input_suffix\" must be provided",
        );
    };
    if let Some(rejection) = check_stop_field(&body) {
        return rejection;
    }

    let content = format!("filled:{}|{}", prefix.len(), suffix.len());
    let predicted = content.split_whitespace().count();
    (
        StatusCode::OK,
        Json(json!({
            "content": content,
            "tokens_predicted": predicted,
            "stop": true,
            "stop_type": "eos",
            "generation_settings": body,
        })),
    )
}

async fn rerank(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let Some(query) = body.get("query").and_then(Value::as_str) else {
        return error_body(StatusCode::BAD_REQUEST, "\"query\" must be provided");
    };
    let Some(documents) = body.get("documents").and_then(Value::as_array) else {
        return error_body(StatusCode::BAD_REQUEST, "\"documents\" must be an array");
    };
    let top_n = body
        .get("top_n")
        .and_then(Value::as_u64)
        .unwrap_or(documents.len() as u64) as usize;

    let mut scored: Vec<(usize, f64)> = documents
        .iter()
        .enumerate()
        .map(|(index, doc)| (index, overlap_score(query, doc.as_str().unwrap_or(""))))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_n);

    let results: Vec<Value> = scored
        .iter()
        .map(|(index, score)| json!({"index": index, "relevance_score": score}))
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "model": model_of(&body),
            "object": "list",
            "results": results,
            "usage": {"prompt_tokens": query.split_whitespace().count(), "total_tokens": 0},
        })),
    )
}

const BOS_ID: i64 = 1;

/// Deterministic stand-in token id: word length offset past the specials.
fn token_id(word: &str) -> i64 {
    word.len() as i64 + 100
}

/// Deterministic 4-dimensional stand-in embedding.
fn embedding_for(text: &str) -> Vec<f64> {
    let byte_sum: u32 = text.bytes().map(u32::from).sum();
    vec![
        text.len() as f64,
        text.split_whitespace().count() as f64,
        f64::from(byte_sum % 997),
        1.0,
    ]
}

/// Minimal chat-template rendering, close enough to a real chatml layout.
fn render_template(messages: &[Value]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let role = message.get("role").and_then(Value::as_str).unwrap_or("user");
        let content = message.get("content").and_then(Value::as_str).unwrap_or("");
        prompt.push_str(&format!("<|{role}|>{content}</s>"));
    }
    prompt.push_str("<|assistant|>");
    prompt
}

/// Fraction of query words found in the document, case-insensitive.
fn overlap_score(query: &str, document: &str) -> f64 {
    let document = document.to_lowercase();
    let query = query.to_lowercase();
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let hits = words.iter().filter(|word| document.contains(**word)).count();
    hits as f64 / words.len() as f64
}
