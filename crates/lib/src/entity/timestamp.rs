//! Decimal second timestamps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::query::QueryError;

/// Seconds since the Unix epoch with millisecond precision.
///
/// Stored as integer milliseconds so ordering and equality are exact. The
/// textual form is a decimal number of seconds, e.g. `"1700000000.250"`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The zero value reported as `last_modified` for empty collections.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from milliseconds since the epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds since the epoch, saturating at
    /// the representable range.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Whole seconds since the epoch, rounded towards negative infinity.
    pub const fn as_secs(self) -> i64 {
        self.0.div_euclid(1000)
    }

    /// Whether this is the zero timestamp.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// RFC 3339 rendering, for human-facing output.
    pub fn to_rfc3339(self) -> String {
        chrono::DateTime::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl FromStr for Timestamp {
    type Err = QueryError;

    /// Parses a decimal seconds value. Fraction digits past the third are
    /// truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QueryError::InvalidTimestamp {
            value: s.to_string(),
        };

        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let secs: i64 = whole.parse().map_err(|_| invalid())?;
        let mut millis: i64 = 0;
        for (i, digit) in fraction.bytes().take(3).enumerate() {
            millis += i64::from(digit - b'0') * 10_i64.pow(2 - i as u32);
        }

        let total = secs
            .checked_mul(1000)
            .and_then(|ms| ms.checked_add(millis))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -total } else { total }))
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self::from_millis(millis)
    }
}
