//! APRS-IS login exchange.
//!
//! After the server banner the client sends:
//! ```text
//! user <CALLSIGN> pass <PASSCODE> vers <SOFTWARE> <VERSION>\r\n
//! ```
//! and the server replies with a comment line:
//! ```text
//! # logresp <CALLSIGN> <verified|unverified>, server <NAME>
//! ```
//! Subscription filters are sent afterwards as `#filter <FILTER>`.

use crate::error::TransportError;

/// Passcode for read-only access.
pub const READ_ONLY_PASSCODE: &str = "-1";

/// Callsign reserved for anonymous, read-only access.
pub const READ_ONLY_CALLSIGN: &str = "N0CALL";

const LOGRESP_PREFIX: &str = "# logresp";

/// Result of a login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Whether the server accepted the session.
    pub authenticated: bool,
    /// Whether the server verified the passcode.
    pub verified: bool,
    /// Server name reported in the response, if any.
    pub server: Option<String>,
}

impl LoginOutcome {
    /// An accepted login.
    #[must_use]
    pub const fn accepted(verified: bool, server: Option<String>) -> Self {
        Self {
            authenticated: true,
            verified,
            server,
        }
    }

    /// A rejected login.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            authenticated: false,
            verified: false,
            server: None,
        }
    }
}

/// Builds the login command sent after the server banner.
#[must_use]
pub fn build_login_command(callsign: &str, passcode: &str, software: &str, version: &str) -> String {
    format!("user {callsign} pass {passcode} vers {software} {version}\r\n")
}

/// Builds the filter command for an established session.
#[must_use]
pub fn build_filter_command(filter: &str) -> String {
    format!("#filter {filter}\r\n")
}

/// Returns true if the line is a `# logresp` reply.
#[must_use]
pub fn is_login_response(line: &str) -> bool {
    logresp_body(line).is_some()
}

/// Returns what follows `# logresp`, if the line is one.
fn logresp_body(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(LOGRESP_PREFIX)?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

/// Interprets the server's `# logresp` reply.
///
/// A login is accepted when the server echoes our callsign and either
/// verified the passcode or the read-only passcode was used.
///
/// # Errors
///
/// Returns [`TransportError::Protocol`] if the line is not a `logresp`
/// reply at all.
pub fn parse_login_response(
    line: &str,
    callsign: &str,
    passcode: &str,
) -> Result<LoginOutcome, TransportError> {
    let rest = logresp_body(line).ok_or_else(|| TransportError::Protocol {
        message: format!("expected logresp, got '{}'", line.trim_end()),
    })?;

    let mut parts = rest.split_whitespace();
    let echoed = parts.next().unwrap_or_default();
    let status = parts.next().unwrap_or_default().trim_end_matches(',');
    let server = match (parts.next(), parts.next()) {
        (Some("server"), Some(name)) => Some(name.to_owned()),
        _ => None,
    };

    if echoed.is_empty() {
        tracing::error!("server responded with an empty callsign");
        return Ok(LoginOutcome::rejected());
    }
    if !echoed.eq_ignore_ascii_case(callsign) {
        tracing::error!("server logged in {} instead of {}", echoed, callsign);
        return Ok(LoginOutcome::rejected());
    }

    let verified = status == "verified";
    if !verified && passcode != READ_ONLY_PASSCODE {
        tracing::error!("server rejected the passcode for {}", callsign);
        return Ok(LoginOutcome::rejected());
    }

    Ok(LoginOutcome::accepted(verified, server))
}
