use prost::{Message, Name};
use prost_types::Any;

use crate::errors::EnvelopeError;
use crate::proto::{JsonType, Noop};

// ============================================================================
// Envelope Codec
// ============================================================================
//
// Packs and unpacks arbitrary typed values into the self-describing `Any`
// envelope the proxy moves state and payloads around in. Three modes share
// one envelope shape:
//
// - typed:    any prost message with a `Name` impl, keyed by its type URL
// - raw JSON: a `JSONType` carrying a UTF-8 JSON string, for dynamic payloads
// - no value: the reserved `Noop` marker
//
// Unpacking never coerces: a type URL mismatch is an error, not a guess.
//
// ============================================================================

/// Pack a typed message into an envelope tagged with its type URL.
pub fn pack<T: Message + Name>(value: &T) -> Any {
    Any {
        type_url: T::type_url(),
        value: value.encode_to_vec(),
    }
}

/// Unpack an envelope into a concrete message type.
///
/// Fails with `TypeMismatch` when the envelope was packed as a different
/// type, and with `Decode` when the bytes do not parse as `T`.
pub fn unpack<T: Message + Name + Default>(envelope: &Any) -> Result<T, EnvelopeError> {
    if envelope.type_url != T::type_url() {
        return Err(EnvelopeError::TypeMismatch {
            expected: T::type_url(),
            got: envelope.type_url.clone(),
        });
    }

    Ok(T::decode(envelope.value.as_slice())?)
}

/// Pack a dynamic JSON value into the reserved raw-JSON envelope.
pub fn pack_json(value: &serde_json::Value) -> Result<Any, EnvelopeError> {
    let content = serde_json::to_string(value)?;
    Ok(pack(&JsonType { content }))
}

/// Unpack a raw-JSON envelope back into a dynamic structure.
pub fn unpack_json(envelope: &Any) -> Result<serde_json::Value, EnvelopeError> {
    let wrapper: JsonType = unpack(envelope)?;

    if wrapper.content.is_empty() {
        return Ok(serde_json::Value::Null);
    }

    Ok(serde_json::from_str(&wrapper.content)?)
}

/// The reserved "no value" envelope.
pub fn noop() -> Any {
    pack(&Noop {})
}

pub fn is_noop(envelope: &Any) -> bool {
    envelope.type_url == Noop::type_url()
}

pub fn is_json(envelope: &Any) -> bool {
    envelope.type_url == JsonType::type_url()
}

impl JsonType {
    /// The default initial state for JSON-mode actors.
    pub fn empty() -> Self {
        JsonType {
            content: "{}".to_string(),
        }
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, EnvelopeError> {
        Ok(JsonType {
            content: serde_json::to_string(value)?,
        })
    }

    pub fn to_value(&self) -> Result<serde_json::Value, EnvelopeError> {
        if self.content.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        Ok(serde_json::from_str(&self.content)?)
    }
}
