//! Duration encoding and formatting
//!
//! Durations are stored as whole milliseconds. Optional durations encode as
//! `null` when absent so they never collapse into a zero interval.

use chrono::Duration;

/// Serde helpers for `chrono::Duration` as integer milliseconds
pub mod millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        i64::deserialize(deserializer).map(Duration::milliseconds)
    }
}

/// Serde helpers for `Option<chrono::Duration>` as nullable milliseconds
pub mod option_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.num_milliseconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::milliseconds))
    }
}

/// Duration in fractional seconds
pub fn as_secs_f64(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

/// Duration in fractional hours
pub fn as_hours_f64(d: Duration) -> f64 {
    as_secs_f64(d) / 3600.0
}

/// Duration from fractional seconds, rounded to the millisecond
pub fn from_secs_f64(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Human-readable form: minutes under an hour, hours under a day, days otherwise
pub fn format_duration(d: Duration) -> String {
    if d < Duration::hours(1) {
        format!("{:.0}m", as_secs_f64(d) / 60.0)
    } else if d < Duration::hours(24) {
        format!("{:.1}h", as_hours_f64(d))
    } else {
        format!("{:.1}d", as_hours_f64(d) / 24.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "millis")]
        wait: Duration,
        #[serde(with = "option_millis")]
        review: Option<Duration>,
    }

    #[test]
    fn test_absent_duration_is_null_not_zero() {
        let sample = Sample {
            wait: Duration::zero(),
            review: None,
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"wait":0,"review":null}"#);
    }

    #[test]
    fn test_duration_encodes_as_millis() {
        let sample = Sample {
            wait: Duration::seconds(90),
            review: Some(Duration::hours(2)),
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"wait":90000,"review":7200000}"#);
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(45)), "45m");
        assert_eq!(format_duration(Duration::minutes(150)), "2.5h");
        assert_eq!(format_duration(Duration::hours(36)), "1.5d");
    }

    #[test]
    fn test_secs_conversions() {
        assert!((as_hours_f64(Duration::minutes(90)) - 1.5).abs() < 1e-9);
        assert_eq!(from_secs_f64(1.5), Duration::milliseconds(1500));
    }
}
