//! Data types for APRS-IS sessions.
//!
//! This module contains the data structures shared across the library:
//! - Packet representations
//! - Session configuration

pub mod config;
pub mod packet;

pub use config::{
    ConfigSnapshot, DEFAULT_CALLSIGN, DEFAULT_FILTER, DEFAULT_PASSCODE, DEFAULT_PORT,
    DEFAULT_SERVER, SessionConfig,
};
pub use packet::{Fields, Packet};
