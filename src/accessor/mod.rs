//! Uniform field access over raw and decoded packets.
//!
//! Raw packets (text or bytes) are decoded on demand through a
//! [`PacketDecoder`]; decoded packets are read as they are. The caller's
//! packet is never modified.
//!
//! ```
//! use aprsis::{Packet, PacketAccessor, PacketDecoder, DecodeError, Fields};
//! use serde_json::json;
//!
//! struct NoDecoder;
//!
//! impl PacketDecoder for NoDecoder {
//!     fn parse(&self, _raw: &[u8]) -> Result<Fields, DecodeError> {
//!         Err(DecodeError::Invalid("no decoder".into()))
//!     }
//!
//!     fn derive_passcode(&self, _callsign: &str) -> String {
//!         "-1".into()
//!     }
//! }
//!
//! let accessor = PacketAccessor::new(NoDecoder);
//! let packet = Packet::try_from(json!({"from": "DF1JSL-15", "to": "APRS"})).unwrap();
//!
//! assert_eq!(accessor.from(&packet).unwrap(), json!("DF1JSL-15"));
//! assert!(accessor.has_to(&packet).unwrap());
//! assert!(!accessor.has_ack_msg_no(&packet).unwrap());
//! ```

use std::borrow::Cow;

use serde_json::Value;

use crate::decoder::{DecodeError, PacketDecoder};
use crate::error::{Error, Result};
use crate::types::{Fields, Packet};

/// Field holding the packet format.
pub const FIELD_FORMAT: &str = "format";
/// Field holding the raw packet.
pub const FIELD_RAW: &str = "raw";
/// Field holding the source callsign.
pub const FIELD_FROM: &str = "from";
/// Field holding the destination.
pub const FIELD_TO: &str = "to";
/// Field holding a message's text.
pub const FIELD_MESSAGE_TEXT: &str = "message_text";
/// Field holding a message response (`ack`/`rej`).
pub const FIELD_RESPONSE: &str = "response";
/// Field holding a message's addressee.
pub const FIELD_ADDRESSE: &str = "addresse";
/// Field holding a message number.
pub const FIELD_MSG_NO: &str = "msgNo";
/// Field holding an acknowledged message number.
pub const FIELD_ACK_MSG_NO: &str = "ackMsgNo";

/// Decodes a raw packet into fields.
///
/// # Errors
///
/// Returns [`Error::InvalidPacket`] for empty or malformed input and
/// [`Error::UnknownFormat`] if the decoder does not recognize the format.
pub fn parse_packet<D: PacketDecoder + ?Sized>(decoder: &D, raw: &[u8]) -> Result<Fields> {
    if raw.is_empty() {
        return Err(Error::InvalidPacket {
            reason: "no packet specified".into(),
        });
    }
    decoder.parse(raw).map_err(|e| match e {
        DecodeError::Invalid(reason) => Error::InvalidPacket { reason },
        DecodeError::UnknownFormat(reason) => Error::UnknownFormat { reason },
    })
}

/// Returns the packet's fields, decoding raw forms.
fn fields<'a, D: PacketDecoder + ?Sized>(decoder: &D, packet: &'a Packet) -> Result<Cow<'a, Fields>> {
    match packet {
        Packet::Text(text) => parse_packet(decoder, text.as_bytes()).map(Cow::Owned),
        Packet::Bytes(bytes) => parse_packet(decoder, bytes).map(Cow::Owned),
        Packet::Decoded(fields) => Ok(Cow::Borrowed(fields)),
    }
}

/// Returns the value of a field.
///
/// # Errors
///
/// Returns [`Error::FieldNotFound`] if the field is absent, or a decode
/// error for raw packets the decoder rejects.
pub fn get_field<D: PacketDecoder + ?Sized>(
    decoder: &D,
    packet: &Packet,
    field: &str,
) -> Result<Value> {
    let not_found = || Error::FieldNotFound {
        field: field.to_owned(),
    };
    match fields(decoder, packet)? {
        Cow::Borrowed(fields) => fields.get(field).cloned().ok_or_else(not_found),
        Cow::Owned(mut fields) => fields.remove(field).ok_or_else(not_found),
    }
}

/// Returns true if the packet has the field.
///
/// # Errors
///
/// Returns a decode error for raw packets the decoder rejects.
pub fn has_field<D: PacketDecoder + ?Sized>(
    decoder: &D,
    packet: &Packet,
    field: &str,
) -> Result<bool> {
    Ok(fields(decoder, packet)?.contains_key(field))
}

/// [`get_field`] for an untyped value.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] if the value is not a string, byte
/// array or object, plus the errors of [`get_field`].
pub fn get_field_value<D: PacketDecoder + ?Sized>(
    decoder: &D,
    value: Value,
    field: &str,
) -> Result<Value> {
    get_field(decoder, &Packet::try_from(value)?, field)
}

/// [`has_field`] for an untyped value.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] if the value is not a string, byte
/// array or object, plus the errors of [`has_field`].
pub fn has_field_value<D: PacketDecoder + ?Sized>(
    decoder: &D,
    value: Value,
    field: &str,
) -> Result<bool> {
    has_field(decoder, &Packet::try_from(value)?, field)
}

/// Defines a getter and a presence check for a well-known field.
macro_rules! field_accessors {
    ($($(#[$doc:meta])* $get:ident, $has:ident => $field:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $get(&self, packet: &Packet) -> Result<Value> {
                self.get_field(packet, $field)
            }

            #[doc = concat!("Returns true if [`Self::", stringify!($get), "`] would find a value.")]
            pub fn $has(&self, packet: &Packet) -> Result<bool> {
                self.has_field(packet, $field)
            }
        )*
    };
}

/// Field access bound to a decoder.
#[derive(Debug, Clone, Default)]
pub struct PacketAccessor<D> {
    decoder: D,
}

impl<D: PacketDecoder> PacketAccessor<D> {
    /// Creates an accessor using the given decoder.
    #[must_use]
    pub const fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Returns the decoder.
    #[must_use]
    pub const fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decodes a raw packet. See [`parse_packet`].
    pub fn parse(&self, raw: &[u8]) -> Result<Fields> {
        parse_packet(&self.decoder, raw)
    }

    /// Returns the value of a field. See [`get_field`].
    pub fn get_field(&self, packet: &Packet, field: &str) -> Result<Value> {
        get_field(&self.decoder, packet, field)
    }

    /// Returns true if the packet has the field. See [`has_field`].
    pub fn has_field(&self, packet: &Packet, field: &str) -> Result<bool> {
        has_field(&self.decoder, packet, field)
    }

    field_accessors! {
        /// Returns the packet format.
        format, has_format => FIELD_FORMAT;
        /// Returns the raw packet.
        raw, has_raw => FIELD_RAW;
        /// Returns the source callsign.
        from, has_from => FIELD_FROM;
        /// Returns the destination.
        to, has_to => FIELD_TO;
        /// Returns the message text.
        message_text, has_message_text => FIELD_MESSAGE_TEXT;
        /// Returns the message response.
        response, has_response => FIELD_RESPONSE;
        /// Returns the message addressee.
        addresse, has_addresse => FIELD_ADDRESSE;
        /// Returns the message number.
        msg_no, has_msg_no => FIELD_MSG_NO;
        /// Returns the acknowledged message number.
        ack_msg_no, has_ack_msg_no => FIELD_ACK_MSG_NO;
    }
}
