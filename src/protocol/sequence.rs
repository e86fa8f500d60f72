//! Message sequence numbers.
//!
//! APRS "message" packets carry a message number used for acknowledgement
//! tracking. Two renderings are in use: the legacy numeric form and the
//! newer two-letter form (`AA`..`ZZ`). The counter is kept within the range
//! both can express, so it wraps after `ZZ` (675).

use std::fmt;

use crate::error::{Error, Result};

/// Highest message number (`ZZ`).
pub const MAX_SEQUENCE_NUMBER: u16 = 675;

const ALPHABET_LEN: u16 = 26;

/// Returns the message number following `current`.
///
/// Wraps to 0 once the result would exceed [`MAX_SEQUENCE_NUMBER`].
#[must_use]
pub fn increment(current: u16) -> u16 {
    let next = current.saturating_add(1);
    if next > MAX_SEQUENCE_NUMBER {
        tracing::debug!("message number exceeds {MAX_SEQUENCE_NUMBER}; resetting to zero");
        0
    } else {
        next
    }
}

/// Renders a message number in its two-letter form.
///
/// # Errors
///
/// Returns [`Error::SequenceOutOfRange`] if `n` exceeds
/// [`MAX_SEQUENCE_NUMBER`].
pub fn to_alphanumeric(n: u32) -> Result<String> {
    let value = u16::try_from(n)
        .ok()
        .filter(|&v| v <= MAX_SEQUENCE_NUMBER)
        .ok_or(Error::SequenceOutOfRange { value: n })?;
    Ok(render(value))
}

fn render(value: u16) -> String {
    // value <= 675 keeps both digits within 0..26
    let first = b'A' + (value / ALPHABET_LEN) as u8;
    let second = b'A' + (value % ALPHABET_LEN) as u8;
    [char::from(first), char::from(second)].iter().collect()
}

/// A message number within `0..=675`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    /// The first message number (`AA`).
    pub const ZERO: Self = Self(0);

    /// The last message number (`ZZ`).
    pub const MAX: Self = Self(MAX_SEQUENCE_NUMBER);

    /// Creates a message number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceOutOfRange`] if `value` exceeds 675.
    pub fn new(value: u16) -> Result<Self> {
        if value > MAX_SEQUENCE_NUMBER {
            return Err(Error::SequenceOutOfRange {
                value: u32::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns the following message number, wrapping after `ZZ`.
    #[must_use]
    pub fn increment(self) -> Self {
        Self(increment(self.0))
    }

    /// Returns the two-letter form.
    #[must_use]
    pub fn to_alphanumeric(self) -> String {
        render(self.0)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for SequenceNumber {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SequenceNumber> for u16 {
    fn from(n: SequenceNumber) -> Self {
        n.0
    }
}
