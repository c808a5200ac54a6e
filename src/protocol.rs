use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One queue item, request and response alike: the response is the request
/// with `sentence_vector` filled in. Fields we don't know about are kept in
/// `extra` so producers get their own payload back untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_tokenized: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_vector: Option<Vec<f32>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid request: {field} is {reason}")]
    Validation { field: &'static str, reason: &'static str },
    #[error("response could not be serialized: {0}")]
    Serialization(#[source] serde_json::Error),
}

pub fn decode(raw: &str) -> Result<Envelope, CodecError> {
    serde_json::from_str(raw).map_err(CodecError::Parse)
}

pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    serde_json::to_string(envelope).map_err(CodecError::Serialization)
}

impl Envelope {
    /// The text to embed; present and non-empty or the request is invalid.
    pub fn text_tokenized(&self) -> Result<&str, CodecError> {
        match self.text_tokenized.as_deref() {
            None => Err(CodecError::Validation {
                field: "text_tokenized",
                reason: "missing",
            }),
            Some("") => Err(CodecError::Validation {
                field: "text_tokenized",
                reason: "empty",
            }),
            Some(t) => Ok(t),
        }
    }

    /// True when the producer asked for one-shot delivery (result key expires).
    pub fn is_single_request(&self) -> bool {
        self.mode.as_deref() == Some(crate::config::protocol::MODE_SINGLE_REQUEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_request() {
        let env = decode(r#"{"id":42,"text_tokenized":"hello world","result_queue":"out","mode":"single_request"}"#).unwrap();
        assert_eq!(env.id, Some(42));
        assert_eq!(env.text_tokenized.as_deref(), Some("hello world"));
        assert_eq!(env.result_queue.as_deref(), Some("out"));
        assert!(env.is_single_request());
        assert!(env.sentence_vector.is_none());
    }

    #[test]
    fn decode_malformed_payload_is_parse_error() {
        let err = decode(r#"{"text_tokenized":"unterminated"#).unwrap_err();
        assert!(matches!(err, CodecError::Parse(_)));
    }

    #[test]
    fn decode_wrong_field_type_is_parse_error() {
        // `text_tokenized` present but not a string must fail at decode,
        // not surface as a silent null later.
        let err = decode(r#"{"text_tokenized":17}"#).unwrap_err();
        assert!(matches!(err, CodecError::Parse(_)));
    }

    #[test]
    fn missing_text_is_validation_error() {
        let env = decode(r#"{"id":1}"#).unwrap();
        let err = env.text_tokenized().unwrap_err();
        assert!(matches!(
            err,
            CodecError::Validation { field: "text_tokenized", reason: "missing" }
        ));
    }

    #[test]
    fn empty_text_is_validation_error() {
        let env = decode(r#"{"text_tokenized":""}"#).unwrap();
        let err = env.text_tokenized().unwrap_err();
        assert!(matches!(
            err,
            CodecError::Validation { field: "text_tokenized", reason: "empty" }
        ));
    }

    #[test]
    fn other_modes_are_not_single_request() {
        let env = decode(r#"{"text_tokenized":"x","mode":"batch"}"#).unwrap();
        assert!(!env.is_single_request());
        let env = decode(r#"{"text_tokenized":"x"}"#).unwrap();
        assert!(!env.is_single_request());
    }

    #[test]
    fn encode_preserves_unknown_fields_and_adds_vector() {
        let mut env = decode(r#"{"id":42,"text_tokenized":"hello world","source":"crawler"}"#).unwrap();
        env.sentence_vector = Some(vec![0.1, -0.2, 0.3, 0.05, -0.4]);
        let raw = encode(&env).unwrap();

        let got: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(got["id"], 42);
        assert_eq!(got["text_tokenized"], "hello world");
        assert_eq!(got["source"], "crawler");
        let vec = got["sentence_vector"].as_array().unwrap();
        assert_eq!(vec.len(), 5);
        // Absent optionals stay absent, they are not serialized as null.
        assert!(got.get("result_queue").is_none());
        assert!(got.get("mode").is_none());
    }

    #[test]
    fn encode_empty_vector_is_empty_array() {
        let mut env = decode(r#"{"text_tokenized":"hello"}"#).unwrap();
        env.sentence_vector = Some(vec![]);
        let raw = encode(&env).unwrap();
        let got: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(got["sentence_vector"], serde_json::json!([]));
    }
}
