//! Lenient timestamp parsing for request bodies.
//!
//! Clients send either RFC 3339 timestamps or naive ones such as
//! `2022-02-22T14:14:14`. Naive timestamps are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an RFC 3339 or naive timestamp.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{}'", input))
}

/// `deserialize_with` adapter for [`parse_timestamp`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_naive_timestamp_as_utc() {
        let parsed = parse_timestamp("2022-02-22T14:14:14").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2022, 2, 22, 14, 14, 14).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let parsed = parse_timestamp("2022-02-22T16:14:14+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2022, 2, 22, 14, 14, 14).unwrap());
    }

    #[test]
    fn test_parse_space_separated_fraction() {
        let parsed = parse_timestamp("2022-02-22 14:14:14.250").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_timestamp("tomorrow").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
