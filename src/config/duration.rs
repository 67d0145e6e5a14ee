//! Human-readable durations in `devctl.yaml`: `"500ms"`, `"5s"`, `"2m"`, or a
//! bare number of seconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Read a `devctl.yaml` duration: digits followed by `ms`, `s`, `m`, or nothing
/// (seconds). `None` for anything else, including overflow.
///
/// ```
/// use devctl::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("750ms"), Some(Duration::from_millis(750)));
/// assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_duration_string("5"), parse_duration_string("5s"));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, unit) = s.split_at(digits);
    let n: u64 = number.parse().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "" | "s" => Some(Duration::from_secs(n)),
        "m" => n.checked_mul(60).map(Duration::from_secs),
        _ => None,
    }
}

/// Render a duration the way [`parse_duration_string`] reads it back.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms % 1000 != 0 {
        format!("{}ms", ms)
    } else if ms % 60_000 == 0 && ms > 0 {
        format!("{}m", ms / 60_000)
    } else {
        format!("{}s", ms / 1000)
    }
}

/// `#[serde(with = "duration_str")]` adapter.
pub mod duration_str {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration_string(&text).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "invalid duration '{}' (expected e.g. 500ms, 5s, 2m)",
                    text
                ))
            }),
        }
    }
}
