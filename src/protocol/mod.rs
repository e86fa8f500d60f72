//! Protocol definitions for APRS-IS communication.
//!
//! This module contains the low-level protocol pieces:
//! - Line framing
//! - The login exchange
//! - Server-side filter validation
//! - Message sequence numbers

pub mod filter;
pub mod line;
pub mod login;
pub mod sequence;

pub use filter::{FILTER_TYPES, validate_filter};
pub use line::{LineDecoder, MAX_LINE_LEN, encode as encode_line, is_comment};
pub use login::{
    LoginOutcome, READ_ONLY_CALLSIGN, READ_ONLY_PASSCODE, build_filter_command,
    build_login_command, parse_login_response,
};
pub use sequence::{MAX_SEQUENCE_NUMBER, SequenceNumber};
