//! Serde `with` module for humantime durations (`"10s"`, `"5m"`, `"1h 30m"`).
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Api {
//!     #[serde(with = "sitecrew_bootstrap::humantime_serde")]
//!     request_timeout: Duration,
//! }
//! ```
//!
//! Bare integers are accepted as milliseconds so env overrides such as
//! `SITECREW__API__REQUEST_TIMEOUT=5000` work too.

use std::fmt;
use std::time::Duration;

use serde::{Deserializer, Serializer, de};

/// # Errors
/// Returns the serializer's error.
pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&humantime::format_duration(*d))
}

/// # Errors
/// Fails on strings humantime cannot parse and on negative numbers.
pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    d.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl de::Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration like \"10s\" or a number of milliseconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        humantime::parse_duration(v.trim()).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_millis(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_millis)
            .map_err(|_| E::custom("duration must not be negative"))
    }
}
