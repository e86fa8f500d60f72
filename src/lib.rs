//! # aprsis
//!
//! A Rust client library for the APRS-IS (Automatic Packet Reporting
//! System Internet Service) network.
//!
//! This library connects to an APRS-IS server over TCP, logs in with a
//! callsign and passcode, applies a server-side filter and then sends and
//! receives APRS packets.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Automatic read-only login for `N0CALL`
//! - Optional self-healing reads that reconnect after network errors
//! - Uniform field access over raw and decoded packets
//!
//! APRS packet decoding and passcode derivation are supplied by the
//! application through [`PacketDecoder`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use aprsis::{DecodeError, Fields, PacketDecoder, Session, SessionConfig};
//!
//! struct MyDecoder;
//!
//! impl PacketDecoder for MyDecoder {
//!     fn parse(&self, raw: &[u8]) -> Result<Fields, DecodeError> {
//!         Err(DecodeError::UnknownFormat(String::from_utf8_lossy(raw).into_owned()))
//!     }
//!
//!     fn derive_passcode(&self, _callsign: &str) -> String {
//!         "-1".into()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aprsis::Error> {
//!     let config = SessionConfig::default().with_filter("r/48.1/11.6/50")?;
//!     let mut session = Session::tcp(config, MyDecoder);
//!
//!     let info = session.connect().await?;
//!     println!("Connected to: {:?}", info.server_name);
//!
//!     // Read one raw packet, reconnecting on network errors
//!     let packet = session.receive(true, true).await?;
//!     println!("Received: {packet}");
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Wire-level helpers (lines, login, filters, sequence numbers)
//! - [`types`] - Session configuration and packet representations
//! - [`transport`] - Transport implementations (currently TCP)
//! - [`decoder`] - Contract for the external APRS decoder
//! - [`accessor`] - Field access over packets
//! - [`session`] - High-level [`Session`]

pub mod accessor;
pub mod decoder;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use accessor::PacketAccessor;
pub use decoder::{DecodeError, PacketDecoder};
pub use error::{Error, Result, TransportError};
pub use protocol::{LoginOutcome, SequenceNumber, validate_filter};
pub use session::{ConnectionInfo, Session};
pub use transport::{Connection, TcpConfig, TcpTransport, Transport};
pub use types::{ConfigSnapshot, Fields, Packet, SessionConfig};
