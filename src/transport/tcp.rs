//! TCP transport implementation.
//!
//! This module provides plain TCP communication with APRS-IS servers,
//! including the banner and login exchange and automatic reconnects for
//! long-running reads.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::TransportError;
use crate::protocol::login::is_login_response;
use crate::protocol::{
    LineDecoder, LoginOutcome, build_filter_command, build_login_command, is_comment,
    parse_login_response,
};
use crate::transport::{Connection, Transport, TransportResult};

/// Software name sent at login.
pub const DEFAULT_SOFTWARE: &str = env!("CARGO_PKG_NAME");

/// Software version sent at login.
pub const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the banner and login response.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Configuration for TCP transport.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Software name reported in the login line.
    pub software: String,
    /// Software version reported in the login line.
    pub version: String,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for the banner and login response.
    pub login_timeout: Duration,
    /// Delay before each reconnect attempt of an immortal read.
    pub reconnect_delay: Duration,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            software: DEFAULT_SOFTWARE.to_owned(),
            version: DEFAULT_VERSION.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl TcpConfig {
    /// Creates a new TCP configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the software name and version reported at login.
    #[must_use]
    pub fn software(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.software = name.into();
        self.version = version.into();
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the login timeout.
    #[must_use]
    pub const fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Sets the reconnect delay.
    #[must_use]
    pub const fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// TCP transport for APRS-IS communication.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    /// Creates a new TCP transport with the given configuration.
    #[must_use]
    pub const fn new(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TcpConfig {
        &self.config
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    fn connect<'a>(
        &'a self,
        server: &'a str,
        port: u16,
    ) -> BoxFuture<'a, TransportResult<Self::Connection>> {
        Box::pin(TcpConnection::open(self.config.clone(), server, port))
    }
}

/// A live TCP connection to an APRS-IS server.
///
/// Uses split read/write halves so the stream can be replaced on reconnect.
pub struct TcpConnection {
    config: TcpConfig,
    server: String,
    port: u16,
    reader: Option<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
    decoder: LineDecoder,
    credentials: Option<(String, String)>,
    filter: Option<String>,
    needs_restore: bool,
}

impl TcpConnection {
    /// Connects to `server:port` and reads the server banner.
    pub async fn open(config: TcpConfig, server: &str, port: u16) -> TransportResult<Self> {
        let mut connection = Self {
            config,
            server: server.to_owned(),
            port,
            reader: None,
            writer: None,
            decoder: LineDecoder::new(),
            credentials: None,
            filter: None,
            needs_restore: false,
        };
        connection.establish().await?;
        Ok(connection)
    }

    async fn establish(&mut self) -> TransportResult<()> {
        let address = format!("{}:{}", self.server, self.port);
        tracing::info!("connecting to APRS-IS server {}", address);

        let connect_timeout = self.config.connect_timeout;
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| TransportError::timeout(connect_timeout))??;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!("failed to set TCP_NODELAY: {}", e);
        }

        let (reader, writer) = stream.into_split();
        self.reader = Some(reader);
        self.writer = Some(writer);
        self.decoder.clear();

        let login_timeout = self.config.login_timeout;
        let banner = tokio::time::timeout(login_timeout, self.read_line())
            .await
            .map_err(|_| TransportError::timeout(login_timeout))??;

        if !is_comment(&banner) {
            self.drop_stream();
            return Err(TransportError::Protocol {
                message: format!(
                    "unexpected server banner '{}'",
                    String::from_utf8_lossy(&banner)
                ),
            });
        }

        tracing::debug!("server banner: {}", String::from_utf8_lossy(&banner));
        Ok(())
    }

    fn drop_stream(&mut self) {
        self.reader = None;
        self.writer = None;
        self.decoder.clear();
    }

    async fn read_line(&mut self) -> TransportResult<Bytes> {
        let mut buf = [0u8; 1024];

        loop {
            if let Some(line) = self.decoder.decode() {
                tracing::trace!("received line: {} bytes", line.len());
                return Ok(line);
            }

            let reader = self.reader.as_mut().ok_or(TransportError::Closed)?;
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                tracing::debug!("APRS-IS server closed the connection");
                return Err(TransportError::Closed);
            }

            tracing::trace!("received {} bytes", n);
            self.decoder.feed(&buf[..n]);
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> TransportResult<()> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        tracing::trace!("sending {} bytes", data.len());
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn await_login_response(
        &mut self,
        callsign: &str,
        passcode: &str,
    ) -> TransportResult<LoginOutcome> {
        loop {
            let line = self.read_line().await?;
            let line = String::from_utf8_lossy(&line).into_owned();
            if is_login_response(&line) {
                return parse_login_response(&line, callsign, passcode);
            }
            tracing::debug!("skipping '{}' while waiting for logresp", line);
        }
    }

    async fn authenticate(&mut self, callsign: &str, passcode: &str) -> TransportResult<LoginOutcome> {
        let command = build_login_command(
            callsign,
            passcode,
            &self.config.software,
            &self.config.version,
        );
        tracing::debug!("logging in as {}", callsign);
        self.write_all(command.as_bytes()).await?;

        let login_timeout = self.config.login_timeout;
        let outcome = tokio::time::timeout(
            login_timeout,
            self.await_login_response(callsign, passcode),
        )
        .await
        .map_err(|_| TransportError::timeout(login_timeout))??;

        if outcome.authenticated {
            self.credentials = Some((callsign.to_owned(), passcode.to_owned()));
        }
        Ok(outcome)
    }

    async fn subscribe(&mut self, filter: &str) -> TransportResult<()> {
        tracing::debug!("applying filter '{}'", filter);
        self.write_all(build_filter_command(filter).as_bytes()).await?;
        self.filter = Some(filter.to_owned());
        Ok(())
    }

    async fn next_packet_line(&mut self) -> TransportResult<Bytes> {
        loop {
            let line = self.read_line().await?;
            if is_comment(&line) {
                tracing::debug!("server: {}", String::from_utf8_lossy(&line));
                continue;
            }
            return Ok(line);
        }
    }

    /// Restores the session after a transient failure.
    ///
    /// Retries until the server accepts us again; a rejected login ends
    /// the attempt. `needs_restore` stays set until login and filter are
    /// both back in place, so a cancelled attempt resumes on the next read.
    async fn reconnect(&mut self) -> TransportResult<()> {
        self.needs_restore = true;
        loop {
            self.drop_stream();
            tokio::time::sleep(self.config.reconnect_delay).await;

            match self.restore().await {
                Ok(()) => {
                    self.needs_restore = false;
                    tracing::info!("reconnected to APRS-IS server {}:{}", self.server, self.port);
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!("reconnect to {}:{} failed: {}", self.server, self.port, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn restore(&mut self) -> TransportResult<()> {
        self.establish().await?;

        if let Some((callsign, passcode)) = self.credentials.clone() {
            let outcome = self.authenticate(&callsign, &passcode).await?;
            if !outcome.authenticated {
                return Err(TransportError::Protocol {
                    message: format!("login for {callsign} rejected after reconnect"),
                });
            }
        }
        if let Some(filter) = self.filter.clone() {
            self.subscribe(&filter).await?;
        }
        Ok(())
    }

    /// Finishes a restore that an earlier, cancelled read left behind.
    async fn resume(&mut self, immortal: bool) -> TransportResult<()> {
        if immortal {
            return self.reconnect().await;
        }

        tracing::debug!("completing interrupted reconnect to {}:{}", self.server, self.port);
        self.drop_stream();
        self.restore().await?;
        self.needs_restore = false;
        Ok(())
    }

    async fn consume(&mut self, immortal: bool) -> TransportResult<Bytes> {
        loop {
            if self.needs_restore {
                self.resume(immortal).await?;
            }
            match self.next_packet_line().await {
                Ok(line) => return Ok(line),
                Err(e) if immortal && e.is_transient() => {
                    tracing::warn!("APRS-IS read failed ({}), reconnecting", e);
                    self.reconnect().await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn shutdown(&mut self) -> TransportResult<()> {
        self.reader = None;
        self.decoder.clear();
        self.needs_restore = false;
        if let Some(mut writer) = self.writer.take() {
            tracing::info!("closing connection to {}:{}", self.server, self.port);
            writer.shutdown().await?;
        }
        Ok(())
    }
}

impl Connection for TcpConnection {
    fn login<'a>(
        &'a mut self,
        callsign: &'a str,
        passcode: &'a str,
    ) -> BoxFuture<'a, TransportResult<LoginOutcome>> {
        Box::pin(self.authenticate(callsign, passcode))
    }

    fn set_filter<'a>(&'a mut self, filter: &'a str) -> BoxFuture<'a, TransportResult<()>> {
        Box::pin(self.subscribe(filter))
    }

    fn send_all(&mut self, data: Bytes) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move { self.write_all(&data).await })
    }

    fn consume_one(&mut self, immortal: bool) -> BoxFuture<'_, TransportResult<Bytes>> {
        Box::pin(self.consume(immortal))
    }

    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(self.shutdown())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;
    use crate::decoder::testing::FakeDecoder;
    use crate::error::Error;
    use crate::session::Session;
    use crate::types::SessionConfig;

    const BANNER: &[u8] = b"# aprsc 2.1.19-g730c5c0\r\n";

    fn fast_config() -> TcpConfig {
        TcpConfig::new()
            .software("aprsis-test", "1.0")
            .login_timeout(Duration::from_secs(2))
            .reconnect_delay(Duration::from_millis(10))
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn session(config: SessionConfig) -> Session<TcpTransport, FakeDecoder> {
        Session::new(config, TcpTransport::new(fast_config()), FakeDecoder)
    }

    fn read_only_config(port: u16) -> SessionConfig {
        SessionConfig::new("127.0.0.1", port, "N0CALL")
            .and_then(|c| c.with_filter("r/48.1/11.6/50"))
            .unwrap()
    }

    async fn listener() -> (TcpListener, u16) {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Plays the server side of a login and returns the stream halves.
    async fn accept_login(
        listener: &TcpListener,
        logresp: &str,
    ) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf, String) {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(BANNER).await.unwrap();
        let mut login = String::new();
        reader.read_line(&mut login).await.unwrap();
        writer.write_all(logresp.as_bytes()).await.unwrap();

        (reader, writer, login)
    }

    #[test]
    fn test_tcp_config_defaults() {
        let config = TcpConfig::new();
        assert_eq!(config.software, "aprsis");
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
    }

    #[test]
    fn test_tcp_config_builder() {
        let transport = TcpTransport::new(
            TcpConfig::new()
                .software("robot", "2.0")
                .connect_timeout(Duration::from_secs(1))
                .login_timeout(Duration::from_secs(3)),
        );
        let config = transport.config();
        assert_eq!(config.software, "robot");
        assert_eq!(config.version, "2.0");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.login_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_login_filter_and_receive() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut reader, mut writer, login) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            let mut filter = String::new();
            reader.read_line(&mut filter).await.unwrap();
            writer
                .write_all(b"# 20 Sep 2025 keepalive\r\nDF1JSL-15>APRS:>hello\r\n")
                .await
                .unwrap();
            (login, filter)
        });

        let transport = TcpTransport::new(fast_config());
        let mut connection = transport.connect("127.0.0.1", port).await.unwrap();

        let outcome = connection.login("N0CALL", "-1").await.unwrap();
        assert!(outcome.authenticated);
        assert_eq!(outcome.server.as_deref(), Some("T2TEST"));

        connection.set_filter("g/MPAD").await.unwrap();
        let line = connection.consume_one(false).await.unwrap();
        assert_eq!(&line[..], b"DF1JSL-15>APRS:>hello");

        let (login, filter) = server.await.unwrap();
        assert_eq!(login, "user N0CALL pass -1 vers aprsis-test 1.0\r\n");
        assert_eq!(filter, "#filter g/MPAD\r\n");

        connection.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_all_writes_bytes() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut reader, _writer, _) =
                accept_login(&listener, "# logresp DF1JSL verified, server T2TEST\r\n").await;
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            line
        });

        let mut connection = TcpTransport::new(fast_config())
            .connect("127.0.0.1", port)
            .await
            .unwrap();
        assert!(connection.login("DF1JSL", "12345").await.unwrap().verified);

        connection
            .send_all(Bytes::from_static(b"DF1JSL>APRS:>test\r\n"))
            .await
            .unwrap();
        assert_eq!(server.await.unwrap(), "DF1JSL>APRS:>test\r\n");
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            accept_login(&listener, "# logresp DF1JSL unverified, server T2TEST\r\n").await
        });

        let mut connection = TcpTransport::new(fast_config())
            .connect("127.0.0.1", port)
            .await
            .unwrap();
        let outcome = connection.login("DF1JSL", "99999").await.unwrap();
        assert!(!outcome.authenticated);
        let _ = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_without_immortal() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (_reader, writer, _) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            drop(writer);
        });

        let mut connection = TcpTransport::new(fast_config())
            .connect("127.0.0.1", port)
            .await
            .unwrap();
        connection.login("N0CALL", "-1").await.unwrap();
        server.await.unwrap();

        let err = connection.consume_one(false).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed), "{err}");
    }

    #[tokio::test]
    async fn test_immortal_read_reconnects() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut reader, writer, _) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            let mut filter = String::new();
            reader.read_line(&mut filter).await.unwrap();
            drop((reader, writer));

            let (mut reader, mut writer, login) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            let mut filter = String::new();
            reader.read_line(&mut filter).await.unwrap();
            writer.write_all(b"DF1JSL>APRS:>back\r\n").await.unwrap();
            (login, filter, reader, writer)
        });

        let mut connection = TcpTransport::new(fast_config())
            .connect("127.0.0.1", port)
            .await
            .unwrap();
        connection.login("N0CALL", "-1").await.unwrap();
        connection.set_filter("r/48.1/11.6/50").await.unwrap();

        let line = connection.consume_one(true).await.unwrap();
        assert_eq!(&line[..], b"DF1JSL>APRS:>back");

        let (login, filter, _reader, _writer) = server.await.unwrap();
        assert!(login.starts_with("user N0CALL pass -1"));
        assert_eq!(filter, "#filter r/48.1/11.6/50\r\n");
    }

    #[tokio::test]
    async fn test_invalid_banner() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"HTTP/1.1 400 Bad Request\r\n").await.unwrap();
            stream
        });

        let result = TcpTransport::new(fast_config())
            .connect("127.0.0.1", port)
            .await;
        assert!(matches!(result, Err(TransportError::Protocol { .. })));
        let _ = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_timeout_keeps_connection() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut reader, mut writer, _) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            let mut filter = String::new();
            reader.read_line(&mut filter).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            writer.write_all(b"DF1JSL>APRS:>late\r\n").await.unwrap();
            (reader, writer)
        });

        let mut session = session(read_only_config(port));
        session.connect().await.unwrap();

        let err = session
            .receive_timeout(false, false, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReceiveTimeout { timeout_ms: 100 }), "{err}");
        assert!(session.is_connected());

        let packet = session.receive(false, false).await.unwrap();
        assert_eq!(session.accessor().from(&packet).unwrap(), json!("DF1JSL"));
        let _ = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_interrupted_reconnect_restores_filter() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            // First socket: log in, take the filter, hang up
            let (mut reader, writer, _) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            let mut filter = String::new();
            reader.read_line(&mut filter).await.unwrap();
            drop((reader, writer));

            // Second socket: answer the login too late
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            writer.write_all(BANNER).await.unwrap();
            let mut login = String::new();
            reader.read_line(&mut login).await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            let _ = writer
                .write_all(b"# logresp N0CALL unverified, server T2TEST\r\n")
                .await;
            drop((reader, writer));

            // Third socket: the resumed restore
            let (mut reader, mut writer, _) =
                accept_login(&listener, "# logresp N0CALL unverified, server T2TEST\r\n").await;
            let mut filter = String::new();
            reader.read_line(&mut filter).await.unwrap();
            writer.write_all(b"DF1JSL>APRS:>filtered\r\n").await.unwrap();
            (filter, reader, writer)
        });

        let mut session = session(read_only_config(port));
        session.connect().await.unwrap();

        let err = session
            .receive_timeout(true, true, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReceiveTimeout { .. }), "{err}");
        assert!(session.is_connected());

        let packet = session.receive(true, false).await.unwrap();
        assert_eq!(packet.to_string(), "DF1JSL>APRS:>filtered");

        let (filter, _reader, _writer) = server.await.unwrap();
        assert_eq!(filter, "#filter r/48.1/11.6/50\r\n");
    }

    #[tokio::test]
    async fn test_rejected_login_after_reconnect() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let first =
                accept_login(&listener, "# logresp DF1JSL verified, server T2TEST\r\n").await;
            drop(first);

            let (_reader, _writer, login) =
                accept_login(&listener, "# logresp DF1JSL unverified, server T2TEST\r\n").await;
            login
        });

        let config = SessionConfig::new("127.0.0.1", port, "DF1JSL")
            .and_then(|c| c.with_passcode("12345"))
            .unwrap();
        let mut session = session(config);
        session.connect().await.unwrap();

        let err = session.receive(true, true).await.unwrap_err();
        assert!(
            matches!(err, Error::Receive(TransportError::Protocol { .. })),
            "{err}"
        );
        assert!(!session.is_connected());
        assert!(session.last_packet().is_none());
        assert!(matches!(
            session.receive(true, true).await,
            Err(Error::NotConnected)
        ));

        assert_eq!(
            server.await.unwrap(),
            "user DF1JSL pass 12345 vers aprsis-test 1.0\r\n"
        );
    }
}
