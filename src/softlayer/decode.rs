//! JSON decoding of provider responses.

use serde_json::{Map, Value};

use super::SoftlayerError;

/// Generic decoded response: the fields each operation reads are looked up by
/// name, nothing else is validated.
pub type DecodedResponse = Map<String, Value>;

/// Decodes a response body as a JSON object.
///
/// A literal `null` decodes to an empty mapping. An empty body is not JSON and
/// is rejected like any other malformed answer.
///
/// # Errors
///
/// Returns [`SoftlayerError::Decode`] carrying the raw body when it is not
/// valid JSON or not a JSON object.
pub fn decode_object(body: &[u8]) -> Result<DecodedResponse, SoftlayerError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(decode_error(
            body,
            format!("expected a JSON object, found {}", kind(&other)),
        )),
        Err(err) => Err(decode_error(body, err.to_string())),
    }
}

fn decode_error(body: &[u8], message: String) -> SoftlayerError {
    SoftlayerError::Decode {
        body: String::from_utf8_lossy(body).into_owned(),
        message,
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn decodes_objects() {
        let map = decode_object(br#"{"id": 12345, "hostname": "web"}"#).expect("valid object");
        assert_eq!(map.get("id").and_then(Value::as_u64), Some(12_345));
        assert_eq!(map.get("hostname").and_then(Value::as_str), Some("web"));
    }

    #[rstest]
    #[case(b"null")]
    #[case(b"{}")]
    fn empty_answers_decode_to_empty_mapping(#[case] body: &[u8]) {
        assert!(decode_object(body).expect("empty answer").is_empty());
    }

    #[rstest]
    #[case(b"")]
    #[case(b"  \n")]
    fn blank_bodies_are_decode_errors(#[case] body: &[u8]) {
        let err = decode_object(body).expect_err("blank body is not JSON");
        assert!(
            matches!(err, SoftlayerError::Decode { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn malformed_json_keeps_raw_body() {
        let err = decode_object(b"<html>gateway timeout</html>").expect_err("not json");
        let SoftlayerError::Decode { body, message } = err else {
            panic!("expected Decode error, got {err:?}");
        };
        assert_eq!(body, "<html>gateway timeout</html>");
        assert!(!message.is_empty());
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = decode_object(b"[1, 2, 3]").expect_err("array is not an object");
        assert!(
            matches!(err, SoftlayerError::Decode { ref message, .. } if message.contains("an array")),
            "unexpected error: {err:?}"
        );
    }
}
