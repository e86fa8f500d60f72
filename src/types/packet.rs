//! APRS packet representations.

use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::error::Error;

/// Decoded packet fields, keyed by field name.
pub type Fields = serde_json::Map<String, Value>;

/// An APRS packet in one of the forms a caller may hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Raw packet as text.
    Text(String),
    /// Raw packet as received from the wire.
    Bytes(Bytes),
    /// Packet already decoded into fields.
    Decoded(Fields),
}

impl Packet {
    /// Returns the raw form, or `None` for a decoded packet.
    #[must_use]
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::Text(text) => Some(text.as_bytes()),
            Self::Bytes(bytes) => Some(bytes),
            Self::Decoded(_) => None,
        }
    }

    /// Returns the decoded fields, or `None` for a raw packet.
    #[must_use]
    pub const fn as_fields(&self) -> Option<&Fields> {
        match self {
            Self::Decoded(fields) => Some(fields),
            Self::Text(_) | Self::Bytes(_) => None,
        }
    }

    /// Returns true if the packet is already decoded.
    #[must_use]
    pub const fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => f.write_str(text),
                Err(_) => write!(f, "<{}>", hex::encode(bytes)),
            },
            Self::Decoded(fields) => write!(f, "{}", Value::Object(fields.clone())),
        }
    }
}

impl From<String> for Packet {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Packet {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for Packet {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Packet {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<Fields> for Packet {
    fn from(fields: Fields) -> Self {
        Self::Decoded(fields)
    }
}

impl TryFrom<Value> for Packet {
    type Error = Error;

    /// Accepts strings, objects, and arrays of byte values.
    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(fields) => Ok(Self::Decoded(fields)),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Self::from)
                .ok_or(Error::UnsupportedType { type_name: "array" }),
            Value::Null => Err(Error::UnsupportedType { type_name: "null" }),
            Value::Bool(_) => Err(Error::UnsupportedType { type_name: "boolean" }),
            Value::Number(_) => Err(Error::UnsupportedType { type_name: "number" }),
        }
    }
}
