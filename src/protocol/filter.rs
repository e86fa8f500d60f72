//! Server-side filter validation.
//!
//! APRS-IS filters are space separated clauses such as `r/48.1/11.6/50`
//! or `b/DF1JSL*`. Only the type letter of the first clause is checked
//! here; the server remains the authority on the full filter grammar.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Filter type letters accepted by APRS-IS servers.
pub const FILTER_TYPES: &str = "rpbotsdaegqmf";

static FILTER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i)^[{FILTER_TYPES}]/")).expect("filter prefix pattern is valid")
});

/// Validates a filter string.
///
/// The empty string is valid and means "no filter".
///
/// # Errors
///
/// Returns [`Error::InvalidFilter`] if a non-empty filter does not begin
/// with a known type letter followed by `/`.
pub fn validate_filter(filter: &str) -> Result<()> {
    if filter.is_empty() || FILTER_PREFIX.is_match(filter) {
        Ok(())
    } else {
        Err(Error::InvalidFilter {
            filter: filter.to_owned(),
        })
    }
}
