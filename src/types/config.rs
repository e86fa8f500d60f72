//! Session configuration.

use crate::error::{Error, Result};
use crate::protocol::{SequenceNumber, validate_filter};

/// Default APRS-IS server.
pub const DEFAULT_SERVER: &str = "euro.aprs2.net";

/// Default APRS-IS port (user-defined filter port).
pub const DEFAULT_PORT: u16 = 14580;

/// Default callsign (read-only access).
pub const DEFAULT_CALLSIGN: &str = "N0CALL";

/// Default passcode (read-only access).
pub const DEFAULT_PASSCODE: &str = "-1";

/// Default filter (none).
pub const DEFAULT_FILTER: &str = "";

/// Connection parameters for an APRS-IS session.
///
/// Every setter validates its input; a rejected value leaves the previous
/// one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    server: String,
    port: u16,
    callsign: String,
    passcode: String,
    filter: String,
    sequence_number: SequenceNumber,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            port: DEFAULT_PORT,
            callsign: DEFAULT_CALLSIGN.to_owned(),
            passcode: DEFAULT_PASSCODE.to_owned(),
            filter: DEFAULT_FILTER.to_owned(),
            sequence_number: SequenceNumber::ZERO,
        }
    }
}

fn missing(field: &'static str) -> Error {
    Error::Configuration {
        field,
        reason: "no value has been specified".into(),
    }
}

impl SessionConfig {
    /// Creates a configuration for the given server and callsign.
    ///
    /// Passcode, filter and sequence number keep their defaults.
    pub fn new(server: impl Into<String>, port: u16, callsign: impl Into<String>) -> Result<Self> {
        Self::default()
            .with_server(server)?
            .with_port(port)?
            .with_callsign(callsign)
    }

    /// Sets the server.
    pub fn with_server(mut self, server: impl Into<String>) -> Result<Self> {
        self.set_server(server)?;
        Ok(self)
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Result<Self> {
        self.set_port(port)?;
        Ok(self)
    }

    /// Sets the callsign.
    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Result<Self> {
        self.set_callsign(callsign)?;
        Ok(self)
    }

    /// Sets the passcode.
    pub fn with_passcode(mut self, passcode: impl Into<String>) -> Result<Self> {
        self.set_passcode(passcode)?;
        Ok(self)
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Result<Self> {
        self.set_filter(filter)?;
        Ok(self)
    }

    /// Sets the message sequence number.
    pub fn with_sequence_number(mut self, n: u16) -> Result<Self> {
        self.set_sequence_number(n)?;
        Ok(self)
    }

    /// Returns the server hostname.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns the server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the callsign (upper case).
    #[must_use]
    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    /// Returns the passcode.
    #[must_use]
    pub fn passcode(&self) -> &str {
        &self.passcode
    }

    /// Returns the filter; empty means no filter.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns the message sequence number.
    #[must_use]
    pub const fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Sets the server hostname.
    pub fn set_server(&mut self, server: impl Into<String>) -> Result<()> {
        let server = server.into();
        if server.is_empty() {
            return Err(missing("server"));
        }
        tracing::debug!("setting server to {}", server);
        self.server = server;
        Ok(())
    }

    /// Sets the server port.
    pub fn set_port(&mut self, port: u16) -> Result<()> {
        if port == 0 {
            return Err(missing("port"));
        }
        tracing::debug!("setting port to {}", port);
        self.port = port;
        Ok(())
    }

    /// Sets the callsign, converting it to upper case.
    pub fn set_callsign(&mut self, callsign: impl Into<String>) -> Result<()> {
        let callsign = callsign.into();
        if callsign.is_empty() {
            return Err(missing("callsign"));
        }
        tracing::debug!("setting callsign to {}", callsign);
        self.callsign = callsign.to_uppercase();
        Ok(())
    }

    /// Sets the passcode.
    pub fn set_passcode(&mut self, passcode: impl Into<String>) -> Result<()> {
        let passcode = passcode.into();
        if passcode.is_empty() {
            return Err(missing("passcode"));
        }
        tracing::debug!("setting passcode");
        self.passcode = passcode;
        Ok(())
    }

    /// Sets the filter. An empty string clears it.
    pub fn set_filter(&mut self, filter: impl Into<String>) -> Result<()> {
        let filter = filter.into();
        validate_filter(&filter).map_err(|e| Error::Configuration {
            field: "filter",
            reason: e.to_string(),
        })?;
        tracing::debug!("setting filter to '{}'", filter);
        self.filter = filter;
        Ok(())
    }

    /// Removes the filter.
    pub fn clear_filter(&mut self) {
        tracing::debug!("clearing filter");
        self.filter.clear();
    }

    /// Sets the message sequence number.
    pub fn set_sequence_number(&mut self, n: u16) -> Result<()> {
        let n = SequenceNumber::new(n).map_err(|e| Error::Configuration {
            field: "sequence number",
            reason: e.to_string(),
        })?;
        tracing::debug!("setting message number to {}", n);
        self.sequence_number = n;
        Ok(())
    }

    /// Advances the message sequence number and returns the new value.
    pub fn increment_sequence_number(&mut self) -> SequenceNumber {
        self.sequence_number = self.sequence_number.increment();
        self.sequence_number
    }

    /// Uses the read-only passcode if this is the anonymous callsign.
    ///
    /// Returns true if the passcode was replaced.
    pub(crate) fn enforce_read_only(&mut self) -> bool {
        if self.callsign == crate::protocol::READ_ONLY_CALLSIGN
            && self.passcode != crate::protocol::READ_ONLY_PASSCODE
        {
            crate::protocol::READ_ONLY_PASSCODE.clone_into(&mut self.passcode);
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self, connected: bool) -> ConfigSnapshot {
        ConfigSnapshot {
            server: self.server.clone(),
            port: self.port,
            callsign: self.callsign.clone(),
            passcode: self.passcode.clone(),
            filter: self.filter.clone(),
            sequence_number: self.sequence_number,
            connected,
        }
    }
}

/// A read-only copy of a session's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Server hostname.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Callsign used for login.
    pub callsign: String,
    /// Passcode used for login.
    pub passcode: String,
    /// Filter; empty means no filter.
    pub filter: String,
    /// Current message sequence number.
    pub sequence_number: SequenceNumber,
    /// Whether the session owns a live connection.
    pub connected: bool,
}
