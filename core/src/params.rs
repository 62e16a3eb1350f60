//! Typed parameter bag and the payload cleaning pass.
//!
//! # Design
//! Hosts hand over one flat, insertion-ordered set of named values per
//! request (strings, integers, floats, booleans, or already-decoded JSON);
//! each endpoint builder reads only the keys it understands. Several string
//! parameters carry JSON-encoded arrays or objects on the wire side;
//! `clean_payload` decodes those after field renaming and silently drops
//! anything that fails to decode. Request construction is best-effort, the
//! server remains the authority on validity.

use serde::de::{Deserializer, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::http::JsonMap;

/// Wire fields whose values may arrive as JSON-encoded text.
///
/// Keyed on wire names: the cleaning pass runs after field renaming, so the
/// stop list is already called `stop` by the time it gets here.
const JSON_TEXT_FIELDS: [&str; 13] = [
    "stop",
    "logit_bias",
    "samplers",
    "messages",
    "tools",
    "response_format",
    "input_extra",
    "documents",
    "lora",
    "response_fields",
    "image_data",
    "dry_sequence_breakers",
    "tokens",
];

/// A single parameter value as supplied by the host.
///
/// Untagged, so a plain JSON value deserializes naturally: `true` becomes
/// `Bool`, `7` becomes `Int`, `0.5` becomes `Float`, `"[1,2]"` stays `Str`
/// (decoding JSON-bearing strings happens per field, not here), and arrays
/// or objects land in `Json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(Value),
}

impl ParamValue {
    /// The JSON form of this value, as it appears in a payload.
    pub fn to_value(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::from(*i),
            ParamValue::Float(f) => Value::from(*f),
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Json(v) => v.clone(),
        }
    }

    /// Borrow the text content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => ParamValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => ParamValue::Str(s),
            other => ParamValue::Json(other),
        }
    }
}

/// Insertion-ordered parameter set for one request.
///
/// Lookup is linear; bags stay small (a few dozen entries) and the order
/// they were filled in must survive into the payload. Serializes as a plain
/// JSON object, which is also how test fixtures and host configs write it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    entries: Vec<(String, ParamValue)>,
}

impl ParamBag {
    pub fn new() -> Self {
        ParamBag::default()
    }

    /// Insert or replace a value. Replacement keeps the key's original
    /// position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style `set`, for literals in tests and host glue.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The named value as text, if present and a string.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    /// The named value as an integer, if present and integral.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(ParamValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// JSON form of the named value, or `default` when the key is absent.
    /// A present-but-empty value is returned verbatim, not defaulted.
    pub fn value_or(&self, key: &str, default: Value) -> Value {
        self.get(key).map(ParamValue::to_value).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (key, value) in iter {
            bag.set(key, value);
        }
        bag
    }
}

impl Serialize for ParamBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParamBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(D::Error::custom(format!(
                "expected a JSON object of parameters, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> Extend<(K, V)> for ParamBag {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

/// Decode a JSON-bearing string parameter.
///
/// Blank and undecodable text both yield `None`; callers decide whether
/// that means "omit the field" or "fall back to an empty collection".
pub(crate) fn decode_json_text(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// Final pass over a built payload: drop nulls, decode JSON-bearing text
/// fields, keep everything else untouched. Field order is preserved.
///
/// A text field that fails to decode is dropped rather than sent raw. Values
/// of the listed fields that are not strings pass through as-is, which makes
/// the pass idempotent.
pub fn clean_payload(payload: JsonMap) -> JsonMap {
    let mut cleaned = JsonMap::new();
    for (key, value) in payload {
        if value.is_null() {
            continue;
        }
        if JSON_TEXT_FIELDS.contains(&key.as_str()) {
            if let Value::String(text) = &value {
                if let Some(decoded) = decode_json_text(text) {
                    cleaned.insert(key, decoded);
                }
                continue;
            }
        }
        cleaned.insert(key, value);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, Value)]) -> JsonMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn set_replaces_in_place() {
        let mut bag = ParamBag::new();
        bag.set("temperature", 0.8);
        bag.set("seed", 42);
        bag.set("temperature", 0.2);

        assert_eq!(bag.len(), 2);
        let keys: Vec<&str> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["temperature", "seed"]);
        assert_eq!(bag.get("temperature"), Some(&ParamValue::Float(0.2)));
    }

    #[test]
    fn typed_accessors_ignore_other_kinds() {
        let bag = ParamBag::new()
            .with("api_key", "secret")
            .with("timeout", 30)
            .with("stream", false);

        assert_eq!(bag.str("api_key"), Some("secret"));
        assert_eq!(bag.str("timeout"), None);
        assert_eq!(bag.int("timeout"), Some(30));
        assert_eq!(bag.int("api_key"), None);
        assert!(bag.contains("stream"));
        assert!(!bag.contains("seed"));
    }

    #[test]
    fn value_or_keeps_present_empty_values() {
        let bag = ParamBag::new().with("model", "");
        assert_eq!(bag.value_or("model", json!("default")), json!(""));
        assert_eq!(bag.value_or("missing", json!("default")), json!("default"));
    }

    #[test]
    fn bag_deserializes_from_a_json_object() {
        let bag: ParamBag =
            serde_json::from_str(r#"{"temperature": 0.7, "seed": 42, "stream": false, "grammar": "root ::= x", "lora": [{"id": 0}]}"#)
                .unwrap();

        assert_eq!(bag.get("temperature"), Some(&ParamValue::Float(0.7)));
        assert_eq!(bag.int("seed"), Some(42));
        assert_eq!(bag.get("stream"), Some(&ParamValue::Bool(false)));
        assert_eq!(bag.str("grammar"), Some("root ::= x"));
        assert_eq!(bag.get("lora"), Some(&ParamValue::Json(json!([{"id": 0}]))));
    }

    #[test]
    fn bag_rejects_non_object_json() {
        assert!(serde_json::from_str::<ParamBag>("[1, 2, 3]").is_err());
        assert!(serde_json::from_str::<ParamBag>("\"text\"").is_err());
    }

    #[test]
    fn bag_serializes_in_insertion_order() {
        let bag = ParamBag::new().with("b", 1).with("a", 2);
        assert_eq!(serde_json::to_string(&bag).unwrap(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn decode_json_text_handles_blank_and_invalid() {
        assert_eq!(decode_json_text(""), None);
        assert_eq!(decode_json_text("   "), None);
        assert_eq!(decode_json_text("not json"), None);
        assert_eq!(decode_json_text("[\"a\",\"b\"]"), Some(json!(["a", "b"])));
        assert_eq!(decode_json_text("{\"x\":1}"), Some(json!({"x": 1})));
    }

    #[test]
    fn clean_drops_nulls_and_decodes_text_fields() {
        let payload = map(&[
            ("prompt", json!("hello")),
            ("grammar", Value::Null),
            ("stop", json!("[\"\\n\",\"User:\"]")),
            ("logit_bias", json!("[[15043,1.0]]")),
            ("temperature", json!(0.8)),
        ]);

        let cleaned = clean_payload(payload);
        let keys: Vec<&String> = cleaned.keys().collect();
        assert_eq!(keys, vec!["prompt", "stop", "logit_bias", "temperature"]);
        assert_eq!(cleaned["stop"], json!(["\n", "User:"]));
        assert_eq!(cleaned["logit_bias"], json!([[15043, 1.0]]));
    }

    #[test]
    fn clean_drops_undecodable_text_fields() {
        let payload = map(&[("stop", json!("not json")), ("samplers", json!("  "))]);
        assert!(clean_payload(payload).is_empty());
    }

    #[test]
    fn clean_keeps_unlisted_string_fields_verbatim() {
        let payload = map(&[("grammar", json!("root ::= \"a\"")), ("prompt", json!("[1]"))]);
        let cleaned = clean_payload(payload);
        assert_eq!(cleaned["grammar"], json!("root ::= \"a\""));
        assert_eq!(cleaned["prompt"], json!("[1]"));
    }

    #[test]
    fn clean_is_idempotent() {
        let payload = map(&[
            ("messages", json!("[{\"role\":\"user\",\"content\":\"hi\"}]")),
            ("stop", json!("[\"x\"]")),
            ("top_k", json!(40)),
        ]);

        let once = clean_payload(payload);
        let twice = clean_payload(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once["messages"], json!([{"role": "user", "content": "hi"}]));
    }

    #[test]
    fn clean_preserves_field_order() {
        let payload = map(&[
            ("z", json!(1)),
            ("stop", json!("[\"a\"]")),
            ("a", json!(2)),
        ]);
        let keys: Vec<String> = clean_payload(payload).keys().cloned().collect();
        assert_eq!(keys, vec!["z", "stop", "a"]);
    }
}
