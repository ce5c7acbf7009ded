// Timestamp helpers
//
// Timestamps persist as RFC 3339 UTC strings with millisecond precision, so the
// stored text sorts the same way the instants do and index range filters work.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, TimeDelta, Utc};

/// Current time, truncated to what the store persists
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Drop precision the store does not persist
pub fn truncate(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(3)
}

/// A fresh `updatedAt` that is strictly later than `previous`
pub fn next_after(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let current = now();
    match previous {
        Some(prev) if current <= prev => truncate(prev) + TimeDelta::milliseconds(1),
        _ => current,
    }
}

pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp: {}", value))
}

/// Serde adapter for required timestamps
pub mod iso {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for optional timestamps
pub mod iso_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&super::format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse(&s).map_err(D::Error::custom)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_has_millisecond_precision() {
        let ts = now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(parse(&format(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_next_after_is_strictly_later() {
        let future = now() + TimeDelta::seconds(60);
        let next = next_after(Some(future));
        assert!(next > future);
        assert_eq!(next - future, TimeDelta::milliseconds(1));

        let past = now() - TimeDelta::seconds(60);
        assert!(next_after(Some(past)) > past);
        assert!(next_after(None) <= now());
    }

    #[test]
    fn test_format_is_fixed_width() {
        let a = parse("2024-03-01T10:00:00Z").unwrap();
        let b = parse("2024-03-01T10:00:00.500Z").unwrap();
        assert_eq!(format(&a), "2024-03-01T10:00:00.000Z");
        assert!(format(&a) < format(&b));
    }

    #[test]
    fn test_parse_accepts_dates_and_offsets() {
        assert_eq!(format(&parse("2024-03-01").unwrap()), "2024-03-01T00:00:00.000Z");
        assert_eq!(format(&parse("2024-03-01T12:00:00+02:00").unwrap()), "2024-03-01T10:00:00.000Z");
        assert!(parse("next tuesday").is_err());
    }
}
