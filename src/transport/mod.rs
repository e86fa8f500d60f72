//! Transport layer for APRS-IS communication.
//!
//! A [`Transport`] opens connections; a [`Connection`] is one live,
//! line-oriented session with a server. Currently only TCP is implemented.

pub mod tcp;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::TransportError;
use crate::protocol::LoginOutcome;

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// The connection type this transport produces.
    type Connection: Connection;

    /// Opens a connection to `server:port`.
    fn connect<'a>(
        &'a self,
        server: &'a str,
        port: u16,
    ) -> BoxFuture<'a, TransportResult<Self::Connection>>;
}

/// A live connection to an APRS-IS server.
pub trait Connection: Send {
    /// Performs the login exchange.
    fn login<'a>(
        &'a mut self,
        callsign: &'a str,
        passcode: &'a str,
    ) -> BoxFuture<'a, TransportResult<LoginOutcome>>;

    /// Subscribes to a server-side filter.
    fn set_filter<'a>(&'a mut self, filter: &'a str) -> BoxFuture<'a, TransportResult<()>>;

    /// Writes data as is.
    fn send_all(&mut self, data: Bytes) -> BoxFuture<'_, TransportResult<()>>;

    /// Reads the next packet line, skipping server comments.
    ///
    /// With `immortal` set the connection re-establishes itself after
    /// transient errors and keeps reading.
    fn consume_one(&mut self, immortal: bool) -> BoxFuture<'_, TransportResult<Bytes>>;

    /// Closes the connection.
    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>>;
}

pub use tcp::{TcpConfig, TcpConnection, TcpTransport};
