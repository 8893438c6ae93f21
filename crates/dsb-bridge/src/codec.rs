//! Binary-to-text payload codecs.
//!
//! The host accepts JSON-representable payloads only (primitive, array or
//! plain object - no raw binary), while document deltas are byte strings. A
//! codec is the thin, replaceable transform between the two.

use crate::error::{DecodeError, EncodeError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dsb_core::Delta;
use serde_json::Value;

/// Transforms deltas into host payloads and back.
pub trait UpdateCodec: Send + Sync + 'static {
    fn encode(&self, delta: &Delta) -> Result<Value, EncodeError>;
    fn decode(&self, payload: &Value) -> Result<Delta, DecodeError>;
}

/// Default codec: the delta's bytes as a base64 JSON string.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base64Codec;

impl UpdateCodec for Base64Codec {
    fn encode(&self, delta: &Delta) -> Result<Value, EncodeError> {
        Ok(Value::String(BASE64.encode(delta.as_bytes())))
    }

    fn decode(&self, payload: &Value) -> Result<Delta, DecodeError> {
        let text = payload.as_str().ok_or(DecodeError::UnexpectedShape {
            expected: "string",
            found: json_type_name(payload),
        })?;
        Ok(Delta::new(BASE64.decode(text)?))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
