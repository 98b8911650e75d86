//! Wire formats shared by the API and its clients.
//!
//! Times travel as `HH:MM` (seconds are accepted on input and dropped).
//! Dates travel as ISO-8601 calendar dates; full date-times are accepted on
//! input and truncated to the calendar date *in the offset they carry*, so a
//! client sending local midnight never lands on the previous UTC day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Format used for wall-clock times on the wire.
pub const CLOCK_FORMAT: &str = "%H:%M";

/// Parse `HH:MM` or `HH:MM:SS` into a time truncated to the minute.
#[must_use]
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, CLOCK_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .and_then(|t| t.with_second(0))
}

/// Render a time as `HH:MM`.
#[must_use]
pub fn format_clock(time: NaiveTime) -> String {
    time.format(CLOCK_FORMAT).to_string()
}

/// Parse a calendar date from `YYYY-MM-DD` or an ISO-8601 date-time.
#[must_use]
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// `#[serde(with = "hhmm")]` for [`NaiveTime`] fields.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize as `HH:MM`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(super::CLOCK_FORMAT))
    }

    /// Deserialize from `HH:MM` or `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Fails when the string is not a valid time of day.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock(&raw).ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:MM")))
    }

    /// Optional variant; `null` and a missing field both map to `None`.
    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        /// Serialize as `HH:MM` or `null`.
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.collect_str(&t.format(super::super::CLOCK_FORMAT)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize from `HH:MM`, `HH:MM:SS` or `null`.
        ///
        /// # Errors
        ///
        /// Fails when a present string is not a valid time of day.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    super::super::parse_clock(&raw)
                        .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:MM")))
                })
                .transpose()
        }
    }
}

/// `#[serde(with = "calendar_date")]` for [`NaiveDate`] fields.
pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize as `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    /// Deserialize from a date or date-time string.
    ///
    /// # Errors
    ///
    /// Fails when the string is not an ISO-8601 date or date-time.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_date(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
    }

    /// Optional variant.
    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        /// Serialize as `YYYY-MM-DD` or `null`.
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize from a date, date-time, or `null`.
        ///
        /// # Errors
        ///
        /// Fails when a present string is not a valid date.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    super::super::parse_calendar_date(&raw).ok_or_else(|| {
                        D::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD"))
                    })
                })
                .transpose()
        }
    }
}

/// Lenient deserializer for optional employee references.
///
/// Booking clients send a number, a numeric string, or a placeholder such as
/// `"undefined"` when no staff member has been chosen yet. Placeholders map
/// to `None`; anything else non-numeric is an error.
pub mod lenient_user_id {
    use serde::{Deserialize, Deserializer, de::Error};

    use crate::types::UserId;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i32),
        Text(String),
    }

    /// Deserialize an optional user id.
    ///
    /// # Errors
    ///
    /// Fails on strings that are neither numeric nor a known placeholder.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<UserId>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(id)) if id > 0 => Ok(Some(UserId::new(id))),
            Some(Raw::Number(id)) => Err(D::Error::custom(format!("invalid user id {id}"))),
            Some(Raw::Text(text)) => {
                let parsed = UserId::parse_optional(&text);
                let trimmed = text.trim();
                if parsed.is_none()
                    && !matches!(trimmed, "" | "undefined" | "null" | "any")
                {
                    return Err(D::Error::custom(format!("invalid user id `{text}`")));
                }
                Ok(parsed)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::types::UserId;

    #[test]
    fn test_parse_clock_variants() {
        let t = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        assert_eq!(parse_clock("14:00"), Some(t));
        assert_eq!(parse_clock(" 14:00:59 "), Some(t));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("2pm"), None);
        assert_eq!(format_clock(t), "14:00");
    }

    #[test]
    fn test_parse_calendar_date_keeps_local_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(parse_calendar_date("2024-06-10"), Some(day));
        // Local midnight in UTC+2 is still the 10th.
        assert_eq!(parse_calendar_date("2024-06-10T00:00:00+02:00"), Some(day));
        assert_eq!(parse_calendar_date("2024-06-10T23:30:00Z"), Some(day));
        assert_eq!(parse_calendar_date("2024-06-10T08:00:00.000"), Some(day));
        assert_eq!(parse_calendar_date("10/06/2024"), None);
    }

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "lenient_user_id::deserialize")]
        employee_id: Option<UserId>,
    }

    #[test]
    fn test_lenient_user_id() {
        let parse = |json: &str| serde_json::from_str::<Body>(json).map(|b| b.employee_id);
        assert_eq!(parse(r#"{"employee_id": 4}"#).unwrap(), Some(UserId::new(4)));
        assert_eq!(parse(r#"{"employee_id": "4"}"#).unwrap(), Some(UserId::new(4)));
        assert_eq!(parse(r#"{"employee_id": "undefined"}"#).unwrap(), None);
        assert_eq!(parse(r#"{"employee_id": null}"#).unwrap(), None);
        assert_eq!(parse("{}").unwrap(), None);
        assert!(parse(r#"{"employee_id": "bob"}"#).is_err());
        assert!(parse(r#"{"employee_id": -3}"#).is_err());
    }
}
