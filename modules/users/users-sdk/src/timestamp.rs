//! Lenient serde for backend-assigned timestamps.
//!
//! Written as RFC 3339. Read from RFC 3339, RFC 2822
//! (`Sat, 03 Feb 2024 04:05:06 GMT`) or a `{ "_seconds", "_nanoseconds" }`
//! object. Anything else reads as `None` with a warning, so one odd record
//! never fails a whole list.
//!
//! ```ignore
//! #[serde(default, with = "crate::timestamp")]
//! created_at: Option<OffsetDateTime>,
//! ```

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Text(String),
    Epoch {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    Other(IgnoredAny),
}

impl Raw {
    fn into_datetime(self) -> Option<OffsetDateTime> {
        match self {
            Self::Text(text) => {
                let parsed = parse_text(text.trim());
                if parsed.is_none() && !text.trim().is_empty() {
                    tracing::warn!(value = %text, "unrecognised timestamp ignored");
                }
                parsed
            }
            Self::Epoch {
                seconds,
                nanoseconds,
            } => {
                let nanos = i128::from(seconds) * 1_000_000_000 + i128::from(nanoseconds);
                let parsed = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok();
                if parsed.is_none() {
                    tracing::warn!(seconds, "timestamp out of range ignored");
                }
                parsed
            }
            Self::Other(IgnoredAny) => {
                tracing::warn!("timestamp of unexpected type ignored");
                None
            }
        }
    }
}

fn parse_text(text: &str) -> Option<OffsetDateTime> {
    if text.is_empty() {
        return None;
    }
    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, &Rfc2822))
        .ok()
        .or_else(|| {
            // HTTP-date style zone names
            let numeric = text.strip_suffix(" GMT").or_else(|| text.strip_suffix(" UTC"))?;
            OffsetDateTime::parse(&format!("{numeric} +0000"), &Rfc2822).ok()
        })
}

/// # Errors
/// Fails only if the underlying serializer does.
#[allow(clippy::ref_option)]
pub fn serialize<S: Serializer>(value: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error> {
    time::serde::rfc3339::option::serialize(value, s)
}

/// # Errors
/// Fails only on input that is not valid for the data format itself.
pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<OffsetDateTime>, D::Error> {
    Ok(Option::<Raw>::deserialize(d)?.and_then(Raw::into_datetime))
}
