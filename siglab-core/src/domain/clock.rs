//! Time-of-day helpers shared by session alignment and intraday reports.

use chrono::{NaiveTime, Timelike};

/// Parse "HH:MM" or "HH:MM:SS".
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// "HH:MM" label of a time-of-day.
pub fn label(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Shift a time-of-day by whole minutes, saturating at the end of the day.
pub fn add_minutes(time: NaiveTime, minutes: u32) -> NaiveTime {
    let (shifted, wrapped) = time.overflowing_add_signed(chrono::Duration::minutes(minutes as i64));
    if wrapped != 0 {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(time)
    } else {
        shifted
    }
}

/// Serde adapter for `NaiveTime` written as "HH:MM".
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::label(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time_of_day(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid time of day '{raw}', expected HH:MM")))
    }

    /// Same adapter for `Option<NaiveTime>`.
    pub mod option {
        use chrono::NaiveTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => s.serialize_some(&super::super::label(*t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) => super::super::parse_time_of_day(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid time of day '{raw}'"))),
            }
        }
    }
}
