/// Serde utility functions for common patterns
use serde::{Deserializer, Serializer};
use std::fmt;
use std::time::Duration;

/// Parse a duration written as `500ms`, `30s`, `2m`, `1h`, or a bare number
/// of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;

    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(value)),
        "ms" => Some(Duration::from_millis(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

/// (De)serialize a `Duration` as either integer seconds or a string like `30s`.
///
/// Usage:
/// ```ignore
/// #[derive(Deserialize, Serialize)]
/// struct Example {
///     #[serde(with = "crate::serde_utils::duration")]
///     timeout: Duration,
/// }
/// ```
pub mod duration {
    use super::*;

    pub fn serialize<S>(value: &Duration, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.subsec_millis() == 0 {
            ser.serialize_str(&format!("{}s", value.as_secs()))
        } else {
            ser.serialize_str(&format!("{}ms", value.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(de: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl serde::de::Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("seconds as an integer or a string like \"30s\"")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Duration::from_secs(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(Duration::from_secs)
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_duration(v).ok_or_else(|| E::custom(format!("invalid duration: {v}")))
            }
        }

        de.deserialize_any(DurationVisitor)
    }
}
