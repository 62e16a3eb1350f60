//! Verify request building against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file names one endpoint and lists cases of (prompt, params,
//! expected path, expected body). Bodies are compared as parsed JSON, which
//! keeps the vectors readable and immune to field-ordering differences;
//! ordering itself is covered by the unit tests.

use llama_client_core::{EndpointKind, LlamaClient, ParamBag};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080";

fn client() -> LlamaClient {
    LlamaClient::new(BASE_URL)
}

fn run_vector_file(raw: &str) {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let endpoint = EndpointKind::parse(vectors["endpoint"].as_str().unwrap()).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let prompt = case["prompt"].as_str().unwrap_or("");
        let params: ParamBag = match case.get("params") {
            Some(value) => serde_json::from_value(value.clone()).unwrap(),
            None => ParamBag::new(),
        };

        let req = c.build_request(endpoint, prompt, &params);
        assert_eq!(
            req.url,
            format!("{BASE_URL}{}", case["expected_path"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(Value::Object(req.body), case["expected_body"], "{name}: body");
    }
}

#[test]
fn completion_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/completion.json"));
}

#[test]
fn chat_completions_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/chat_completions.json"));
}

#[test]
fn embeddings_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/embeddings.json"));
}

#[test]
fn tokenize_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/tokenize.json"));
}

#[test]
fn detokenize_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/detokenize.json"));
}

#[test]
fn apply_template_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/apply_template.json"));
}

#[test]
fn infill_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/infill.json"));
}

#[test]
fn reranking_test_vectors() {
    run_vector_file(include_str!("../../test-vectors/reranking.json"));
}
