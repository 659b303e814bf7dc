//! `PREFIX-NNNN` registration numbers.

use tracing::warn;

pub use registration_store::parse_suffix;

/// Prefix used for Customs PACT 2025 registrations.
pub const DEFAULT_PREFIX: &str = "TCP2025";

/// Minimum number of suffix digits; larger suffixes widen.
pub const SUFFIX_WIDTH: usize = 4;

/// Format a registration number, zero-padding the suffix to four digits.
pub fn format_identifier(prefix: &str, suffix: u64) -> String {
    format!("{}-{:0width$}", prefix, suffix, width = SUFFIX_WIDTH)
}

/// Suffix that follows `latest`.
///
/// No previous number starts the sequence at 1. A malformed previous number
/// also restarts at 1, logged at warn level: the storage uniqueness
/// constraint is what keeps a restarted sequence from reissuing a number.
pub fn next_suffix(latest: Option<&str>) -> u64 {
    let Some(latest) = latest else {
        return 1;
    };

    match parse_suffix(latest).and_then(|n| n.checked_add(1)) {
        Some(next) => next,
        None => {
            warn!(
                registration_number = %latest,
                "Latest registration number is malformed, restarting suffix at 1"
            );
            1
        }
    }
}
