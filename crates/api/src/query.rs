//! Query parameters shared by the metrics and analytics endpoints

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::rollups::AggregationPeriod;
use serde::Deserialize;

use crate::error::ApiError;

/// Default look-back window when no start date is given
const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Comma-separated author logins
    pub developers: Option<String>,
    /// Comma-separated `owner/name` list
    pub repositories: Option<String>,
    pub period: Option<String>,
    pub limit: Option<usize>,
    /// Serve a stored rollup covering the window instead of recomputing
    pub cached: Option<bool>,
}

/// Validated form of [`MetricsQuery`]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub developers: Vec<String>,
    pub repositories: Vec<String>,
    pub period: AggregationPeriod,
    pub limit: Option<usize>,
    pub cached: bool,
}

impl MetricsQuery {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<MetricsFilter, ApiError> {
        let end = match &self.end_date {
            Some(raw) => parse_date(raw, true)?,
            None => now,
        };
        let start = match &self.start_date {
            Some(raw) => parse_date(raw, false)?,
            None => end - Duration::days(DEFAULT_WINDOW_DAYS),
        };
        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }

        let period = match &self.period {
            Some(raw) => raw
                .parse()
                .map_err(|e: common::Error| ApiError::BadRequest(e.to_string()))?,
            None => AggregationPeriod::Weekly,
        };
        if self.limit == Some(0) {
            return Err(ApiError::BadRequest("limit must be positive".to_string()));
        }

        Ok(MetricsFilter {
            start,
            end,
            developers: split_list(self.developers.as_deref()),
            repositories: split_list(self.repositories.as_deref()),
            period,
            limit: self.limit,
            cached: self.cached.unwrap_or(false),
        })
    }
}

/// Plain dates cover the whole day: start of day for a start bound, end of day for an end bound
fn parse_date(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date {raw:?}")))?;
    let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
    if end_of_day {
        Ok(midnight + Duration::days(1) - Duration::milliseconds(1))
    } else {
        Ok(midnight)
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let filter = MetricsQuery::default().resolve(now()).unwrap();
        assert_eq!(filter.end, now());
        assert_eq!(filter.start, now() - Duration::days(30));
        assert_eq!(filter.period, AggregationPeriod::Weekly);
        assert!(filter.developers.is_empty());
        assert!(!filter.cached);
    }

    #[test]
    fn test_plain_dates_cover_whole_days() {
        let query = MetricsQuery {
            start_date: Some("2026-01-01".to_string()),
            end_date: Some("2026-01-31".to_string()),
            developers: Some("alice, bob,,".to_string()),
            period: Some("monthly".to_string()),
            ..Default::default()
        };
        let filter = query.resolve(now()).unwrap();
        assert_eq!(filter.start, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            filter.end,
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap() - Duration::milliseconds(1)
        );
        assert_eq!(filter.developers, vec!["alice", "bob"]);
        assert_eq!(filter.period, AggregationPeriod::Monthly);
    }

    #[test]
    fn test_rfc3339_dates() {
        let query = MetricsQuery {
            start_date: Some("2026-01-01T09:00:00+09:00".to_string()),
            ..Default::default()
        };
        let filter = query.resolve(now()).unwrap();
        assert_eq!(filter.start, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_parameters() {
        let bad_date = MetricsQuery {
            start_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_date.resolve(now()), Err(ApiError::BadRequest(_))));

        let inverted = MetricsQuery {
            start_date: Some("2026-02-01".to_string()),
            end_date: Some("2026-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(inverted.resolve(now()), Err(ApiError::BadRequest(_))));

        let bad_period = MetricsQuery {
            period: Some("yearly".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_period.resolve(now()), Err(ApiError::BadRequest(_))));
    }
}
