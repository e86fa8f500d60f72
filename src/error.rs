//! Error types for the aprsis library.

use thiserror::Error;

/// The main error type for aprsis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is missing or malformed.
    #[error("invalid APRS-IS {field}: {reason}")]
    Configuration { field: &'static str, reason: String },

    /// `connect` was called while a connection is still owned.
    #[error("an APRS-IS connection is still open; close it first")]
    AlreadyConnected,

    /// The operation needs a live connection.
    #[error("not connected to APRS-IS")]
    NotConnected,

    /// Connecting or logging in failed.
    #[error("cannot connect to APRS-IS with server {server} port {port} callsign {callsign}: {reason}")]
    Connection {
        server: String,
        port: u16,
        callsign: String,
        reason: String,
    },

    /// Writing a packet to the server failed.
    #[error("error while sending packet '{packet}' to APRS-IS")]
    Send {
        packet: String,
        #[source]
        source: TransportError,
    },

    /// Reading from the server failed.
    #[error("error while receiving from APRS-IS: {0}")]
    Receive(#[source] TransportError),

    /// No packet arrived before the receive deadline.
    #[error("no APRS packet received within {timeout_ms}ms")]
    ReceiveTimeout { timeout_ms: u64 },

    /// The decoder rejected the packet.
    #[error("APRS packet is invalid: {reason}")]
    InvalidPacket { reason: String },

    /// The decoder does not recognize the packet format.
    #[error("unknown APRS format: {reason}")]
    UnknownFormat { reason: String },

    /// The decoded packet has no such field.
    #[error("attribute '{field}' is not present in this APRS packet")]
    FieldNotFound { field: String },

    /// The value is neither text, bytes nor a decoded mapping.
    #[error("value of type {type_name} does not look like an APRS packet")]
    UnsupportedType { type_name: &'static str },

    /// The filter does not start with a known filter type.
    #[error("invalid APRS-IS server filter string '{filter}'")]
    InvalidFilter { filter: String },

    /// The value cannot be rendered as a two-letter message number.
    #[error("message number {value} is outside 0..=675")]
    SequenceOutOfRange { value: u32 },
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// The server did not answer in time.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The server sent something the login exchange did not expect.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl TransportError {
    /// Builds a timeout error from a duration.
    #[must_use]
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns true if a reconnect may recover from this error.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Closed | Self::Timeout { .. })
    }
}

/// Result type alias for aprsis operations.
pub type Result<T> = std::result::Result<T, Error>;
