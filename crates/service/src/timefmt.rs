//! `HH:MM` time and `YYYY-MM-DD` date helpers shared by the wire types.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::errors::ServiceError;

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, ServiceError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ServiceError::Validation(format!("{field} must be HH:MM")))
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::Validation(format!("{field} must be YYYY-MM-DD")))
}

/// `date + days`, or a validation error when the result leaves the calendar.
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, ServiceError> {
    Duration::try_days(days)
        .and_then(|d| date.checked_add_signed(d))
        .ok_or_else(|| ServiceError::Validation(format!("date range starting {date} is out of bounds")))
}

pub fn hhmm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Serde adapter writing `NaiveTime` as `HH:MM`.
pub mod hhmm_serde {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::hhmm(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time("time", &raw).map_err(serde::de::Error::custom)
    }
}

/// Same as [`hhmm_serde`] for optional times; blank strings read as `None`.
pub mod hhmm_opt_serde {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_str(&super::hhmm(*t)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) if !raw.trim().is_empty() => {
                super::parse_time("time", &raw).map(Some).map_err(serde::de::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_seconds_and_rejects_garbage() {
        assert_eq!(parse_time("t", "09:30:00").expect("time"), NaiveTime::from_hms_opt(9, 30, 0).expect("t"));
        assert!(parse_time("t", "9.30").is_err());
        assert!(parse_date("d", "2026-02-30").is_err());
    }

    #[test]
    fn add_days_stops_at_the_calendar_edge() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 27).expect("date");
        assert_eq!(add_days(d, 2).expect("in range"), NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"));
        assert!(matches!(add_days(NaiveDate::MAX, 1), Err(ServiceError::Validation(_))));
        assert!(add_days(NaiveDate::MIN, -1).is_err());
    }
}
