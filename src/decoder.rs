//! Contract for the external APRS packet decoder.
//!
//! The APRS packet grammar and the passcode algorithm live outside this
//! crate. Implement [`PacketDecoder`] on top of whichever APRS parser the
//! application uses.

use thiserror::Error;

use crate::types::Fields;

/// Failure reported by a [`PacketDecoder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The packet is malformed.
    #[error("{0}")]
    Invalid(String),

    /// The packet is well formed but of a format the decoder does not know.
    #[error("{0}")]
    UnknownFormat(String),
}

/// Decodes raw APRS packets into fields.
pub trait PacketDecoder: Send + Sync {
    /// Parses one raw packet (a single line, without terminator).
    fn parse(&self, raw: &[u8]) -> Result<Fields, DecodeError>;

    /// Derives the APRS-IS passcode for a callsign.
    fn derive_passcode(&self, callsign: &str) -> String;
}

impl<D: PacketDecoder + ?Sized> PacketDecoder for &D {
    fn parse(&self, raw: &[u8]) -> Result<Fields, DecodeError> {
        (**self).parse(raw)
    }

    fn derive_passcode(&self, callsign: &str) -> String {
        (**self).derive_passcode(callsign)
    }
}

impl<D: PacketDecoder + ?Sized> PacketDecoder for std::sync::Arc<D> {
    fn parse(&self, raw: &[u8]) -> Result<Fields, DecodeError> {
        (**self).parse(raw)
    }

    fn derive_passcode(&self, callsign: &str) -> String {
        (**self).derive_passcode(callsign)
    }
}
