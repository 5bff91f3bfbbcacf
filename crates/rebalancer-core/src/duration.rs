//! Duration strings ("30s", "5m", "1h 30m").

use std::time::Duration;

use thiserror::Error;

/// A duration string that cannot be used as a period.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,

    #[error("invalid duration {value:?}: {reason}")]
    Invalid { value: String, reason: String },

    #[error("duration {0:?} must be greater than zero")]
    Zero(String),
}

/// Parse a re-evaluation period.
///
/// Unlike the lenient parsers used for optional knobs, malformed input is
/// an error: an interval is never silently defaulted.
pub fn parse_interval(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let d = humantime::parse_duration(s).map_err(|e| DurationError::Invalid {
        value: s.to_string(),
        reason: e.to_string(),
    })?;

    if d.is_zero() {
        return Err(DurationError::Zero(s.to_string()));
    }
    Ok(d)
}
