//! Main [`Session`] implementation.
//!
//! This module provides the high-level [`Session`] that combines
//! configuration, transport and packet decoding into one APRS-IS session.

use std::time::Duration;

use crate::accessor::{PacketAccessor, parse_packet};
use crate::decoder::PacketDecoder;
use crate::error::{Error, Result, TransportError};
use crate::protocol::{LoginOutcome, SequenceNumber, encode_line};
use crate::transport::{Connection, TcpTransport, Transport, TransportResult};
use crate::types::{ConfigSnapshot, Fields, Packet, SessionConfig};

/// Details of an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Server hostname we connected to.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Callsign we logged in with.
    pub callsign: String,
    /// Server name reported at login.
    pub server_name: Option<String>,
    /// Whether the passcode was verified (false for read-only sessions).
    pub verified: bool,
}

/// An APRS-IS client session.
///
/// A session owns at most one connection. Methods take `&mut self` and are
/// meant to be driven by a single task; wrap the session in a
/// `tokio::sync::Mutex` to share it.
pub struct Session<T: Transport, D> {
    config: SessionConfig,
    transport: T,
    decoder: D,
    connection: Option<T::Connection>,
    last_packet: Option<Packet>,
    simulate: bool,
    simulated: Vec<String>,
}

impl<D: PacketDecoder> Session<TcpTransport, D> {
    /// Creates a TCP session with the given configuration.
    #[must_use]
    pub fn tcp(config: SessionConfig, decoder: D) -> Self {
        Self::new(config, TcpTransport::default(), decoder)
    }
}

impl<T: Transport, D: PacketDecoder> Session<T, D> {
    /// Creates a new session (not yet connected).
    #[must_use]
    pub const fn new(config: SessionConfig, transport: T, decoder: D) -> Self {
        Self {
            config,
            transport,
            decoder,
            connection: None,
            last_packet: None,
            simulate: false,
            simulated: Vec::new(),
        }
    }

    // ==================== Configuration ====================

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns a read-only copy of the configuration and connection state.
    #[must_use]
    pub fn configuration(&self) -> ConfigSnapshot {
        self.config.snapshot(self.is_connected())
    }

    /// Returns the server hostname.
    #[must_use]
    pub fn server(&self) -> &str {
        self.config.server()
    }

    /// Returns the server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.config.port()
    }

    /// Returns the callsign.
    #[must_use]
    pub fn callsign(&self) -> &str {
        self.config.callsign()
    }

    /// Returns the passcode.
    #[must_use]
    pub fn passcode(&self) -> &str {
        self.config.passcode()
    }

    /// Returns the filter; empty means no filter.
    #[must_use]
    pub fn filter(&self) -> &str {
        self.config.filter()
    }

    /// Returns the message sequence number.
    #[must_use]
    pub const fn sequence_number(&self) -> SequenceNumber {
        self.config.sequence_number()
    }

    /// Returns the message sequence number in its two-letter form.
    #[must_use]
    pub fn sequence_number_alphanumeric(&self) -> String {
        self.config.sequence_number().to_alphanumeric()
    }

    /// Sets the server hostname.
    pub fn set_server(&mut self, server: impl Into<String>) -> Result<()> {
        self.config.set_server(server)
    }

    /// Sets the server port.
    pub fn set_port(&mut self, port: u16) -> Result<()> {
        self.config.set_port(port)
    }

    /// Sets the callsign (stored in upper case).
    pub fn set_callsign(&mut self, callsign: impl Into<String>) -> Result<()> {
        self.config.set_callsign(callsign)
    }

    /// Sets the passcode.
    pub fn set_passcode(&mut self, passcode: impl Into<String>) -> Result<()> {
        self.config.set_passcode(passcode)
    }

    /// Sets the filter. An empty string clears it.
    pub fn set_filter(&mut self, filter: impl Into<String>) -> Result<()> {
        self.config.set_filter(filter)
    }

    /// Removes the filter.
    pub fn clear_filter(&mut self) {
        self.config.clear_filter();
    }

    /// Sets the message sequence number.
    pub fn set_sequence_number(&mut self, n: u16) -> Result<()> {
        self.config.set_sequence_number(n)
    }

    /// Advances the message sequence number and returns the new value.
    pub fn increment_sequence_number(&mut self) -> SequenceNumber {
        tracing::debug!("incrementing message number");
        self.config.increment_sequence_number()
    }

    /// Enables or disables simulated sends.
    ///
    /// While simulating, [`send`](Self::send) performs no I/O and does not
    /// need a connection; packets are recorded in
    /// [`simulated_packets`](Self::simulated_packets) instead.
    pub fn set_simulate(&mut self, simulate: bool) {
        self.simulate = simulate;
    }

    /// Returns true if sends are simulated.
    #[must_use]
    pub const fn is_simulating(&self) -> bool {
        self.simulate
    }

    /// Returns the packets recorded by simulated sends.
    #[must_use]
    pub fn simulated_packets(&self) -> &[String] {
        &self.simulated
    }

    // ==================== Packets ====================

    /// Returns the most recently received packet.
    #[must_use]
    pub const fn last_packet(&self) -> Option<&Packet> {
        self.last_packet.as_ref()
    }

    /// Returns a field accessor using this session's decoder.
    #[must_use]
    pub const fn accessor(&self) -> PacketAccessor<&D> {
        PacketAccessor::new(&self.decoder)
    }

    /// Decodes a raw packet.
    pub fn parse_packet(&self, raw: &[u8]) -> Result<Fields> {
        parse_packet(&self.decoder, raw)
    }

    /// Derives the passcode for `callsign`, or for the configured callsign.
    #[must_use]
    pub fn calculate_passcode(&self, callsign: Option<&str>) -> String {
        let callsign = callsign
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.config.callsign());
        self.decoder.derive_passcode(callsign)
    }

    // ==================== Connection ====================

    /// Returns true if the session owns a connection.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection_error(&self, reason: impl Into<String>) -> Error {
        Error::Connection {
            server: self.config.server().to_owned(),
            port: self.config.port(),
            callsign: self.config.callsign().to_owned(),
            reason: reason.into(),
        }
    }

    /// Connects and logs in to the configured server.
    ///
    /// This will:
    /// 1. Force the read-only passcode for `N0CALL`
    /// 2. Open the transport connection
    /// 3. Log in with callsign and passcode
    /// 4. Apply the filter, if one is configured
    ///
    /// A failed login closes the connection again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConnected`] if a connection is open, or
    /// [`Error::Connection`] if connecting or logging in fails.
    pub async fn connect(&mut self) -> Result<ConnectionInfo> {
        if self.connection.is_some() {
            return Err(Error::AlreadyConnected);
        }

        if self.config.enforce_read_only() {
            tracing::debug!("callsign is N0CALL; resetting passcode to read-only value");
        }

        tracing::info!(
            "connecting to APRS-IS {}:{} as {}",
            self.config.server(),
            self.config.port(),
            self.config.callsign()
        );

        let connection = match self
            .transport
            .connect(self.config.server(), self.config.port())
            .await
        {
            Ok(connection) => connection,
            Err(e) => return Err(self.connection_error(e.to_string())),
        };
        self.connection = Some(connection);

        let outcome = match self.handshake().await {
            Ok(outcome) if outcome.authenticated => outcome,
            Ok(_) => {
                self.disconnect().await;
                return Err(self.connection_error("login was not accepted"));
            }
            Err(e) => {
                self.disconnect().await;
                return Err(self.connection_error(e.to_string()));
            }
        };

        tracing::info!("successfully connected to APRS-IS");
        Ok(ConnectionInfo {
            server: self.config.server().to_owned(),
            port: self.config.port(),
            callsign: self.config.callsign().to_owned(),
            server_name: outcome.server,
            verified: outcome.verified,
        })
    }

    async fn handshake(&mut self) -> TransportResult<LoginOutcome> {
        let connection = self.connection.as_mut().ok_or(TransportError::Closed)?;

        let outcome = connection
            .login(self.config.callsign(), self.config.passcode())
            .await?;

        if outcome.authenticated && !self.config.filter().is_empty() {
            connection.set_filter(self.config.filter()).await?;
        }
        Ok(outcome)
    }

    /// Closes the connection, if any.
    pub async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::warn!("error while closing APRS-IS connection: {}", e);
            }
            tracing::info!("disconnected from APRS-IS");
        }
    }

    /// Sends one packet line as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection (unless
    /// simulating) or [`Error::Send`] if the write fails.
    pub async fn send(&mut self, packet: &str) -> Result<()> {
        if self.simulate {
            tracing::info!("simulating send of '{}'", packet);
            self.simulated.push(packet.to_owned());
            return Ok(());
        }

        let connection = self.connection.as_mut().ok_or(Error::NotConnected)?;
        tracing::debug!("sending '{}' to APRS-IS", packet);

        connection
            .send_all(encode_line(packet.as_bytes()))
            .await
            .map_err(|source| Error::Send {
                packet: packet.to_owned(),
                source,
            })
    }

    /// Receives exactly one packet.
    ///
    /// With `raw` set the packet is returned undecoded; otherwise packets
    /// the decoder rejects are skipped. With `immortal` set the connection
    /// recovers from transient errors instead of failing.
    ///
    /// A failure the connection cannot recover from, such as the server
    /// refusing the login after a reconnect, also closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection or
    /// [`Error::Receive`] if reading fails.
    pub async fn receive(&mut self, raw: bool, immortal: bool) -> Result<Packet> {
        if self.connection.is_none() {
            return Err(Error::NotConnected);
        }
        tracing::debug!("waiting for an APRS packet");

        match self.next_packet(raw, immortal).await {
            Ok(packet) => {
                self.last_packet = Some(packet.clone());
                Ok(packet)
            }
            Err(e) => {
                if !e.is_transient() {
                    tracing::warn!("APRS-IS connection is unusable ({}), closing it", e);
                    self.disconnect().await;
                }
                Err(Error::Receive(e))
            }
        }
    }

    async fn next_packet(&mut self, raw: bool, immortal: bool) -> TransportResult<Packet> {
        let connection = self.connection.as_mut().ok_or(TransportError::Closed)?;

        loop {
            let line = connection.consume_one(immortal).await?;

            if raw {
                return Ok(Packet::Bytes(line));
            }
            match parse_packet(&self.decoder, &line) {
                Ok(fields) => return Ok(Packet::Decoded(fields)),
                Err(e) => tracing::warn!(
                    "skipping packet '{}': {}",
                    String::from_utf8_lossy(&line),
                    e
                ),
            }
        }
    }

    /// Like [`receive`](Self::receive), but gives up after `timeout`.
    ///
    /// The connection stays open when the timeout expires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReceiveTimeout`] if no packet arrived in time, plus
    /// the errors of [`receive`](Self::receive).
    pub async fn receive_timeout(
        &mut self,
        raw: bool,
        immortal: bool,
        timeout: Duration,
    ) -> Result<Packet> {
        tokio::time::timeout(timeout, self.receive(raw, immortal))
            .await
            .unwrap_or_else(|_| {
                Err(Error::ReceiveTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            })
    }
}
