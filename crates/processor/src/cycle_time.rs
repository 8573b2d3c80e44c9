//! Lifecycle interval derivation for a single PR

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, NaiveTime, Offset, Timelike, Utc,
    Weekday,
};
use common::models::{PrMetrics, PullRequestRecord, ReviewEvent, ReviewEventKind, TimeMetrics};
use common::rollups::CycleTimeStats;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats;

/// Gaps between review responses longer than this are waiting, not reviewing
const ACTIVE_REVIEW_GAP: i64 = 2;
/// Floor for the active review estimate once any response exists
const MIN_ACTIVE_REVIEW_MINUTES: i64 = 5;

/// Interval measurement settings
#[derive(Debug, Clone)]
pub struct CycleTimeConfig {
    /// Count only time inside the daily business window
    pub use_business_hours: bool,
    pub business_start_hour: u32,
    /// Exclusive; 24 means midnight of the next day
    pub business_end_hour: u32,
    pub exclude_weekends: bool,
    /// Zone the business window is defined in
    pub timezone: FixedOffset,
}

impl Default for CycleTimeConfig {
    fn default() -> Self {
        Self {
            use_business_hours: false,
            business_start_hour: 9,
            business_end_hour: 18,
            exclude_weekends: false,
            timezone: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl From<&common::Config> for CycleTimeConfig {
    fn from(config: &common::Config) -> Self {
        Self {
            use_business_hours: config.business_hours,
            business_start_hour: config.business_start_hour,
            business_end_hour: config.business_end_hour,
            exclude_weekends: config.exclude_weekends,
            timezone: FixedOffset::east_opt(config.business_utc_offset_hours * 3600)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Cycle-time summary over a batch of PRs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CycleTimeStatistics {
    pub total_prs: usize,
    #[serde(flatten)]
    pub stats: CycleTimeStats,
}

/// Review events in timestamp order. Ties keep their input order.
pub fn chronological(events: &[ReviewEvent]) -> Vec<&ReviewEvent> {
    let mut sorted: Vec<&ReviewEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.created_at);
    for event in &sorted {
        if let ReviewEventKind::Unknown(raw) = &event.kind {
            debug!("Ignoring review event of unknown kind {} by {}", raw, event.actor);
        }
    }
    sorted
}

pub struct CycleTimeCalculator {
    config: CycleTimeConfig,
}

impl Default for CycleTimeCalculator {
    fn default() -> Self {
        Self::new(CycleTimeConfig::default())
    }
}

impl CycleTimeCalculator {
    pub fn new(config: CycleTimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CycleTimeConfig {
        &self.config
    }

    /// Derive every lifecycle interval for one PR
    pub fn calculate_time_metrics(
        &self,
        pr: &PullRequestRecord,
        events: &[ReviewEvent],
    ) -> TimeMetrics {
        let events = chronological(events);

        TimeMetrics {
            total_cycle_time: self.total_cycle_time(pr),
            time_to_first_review: self.time_to_first_review(pr, &events),
            time_to_approval: self.time_to_approval(pr, &events),
            time_to_merge: self.time_to_merge(pr, &events),
            review_wait_time: self.review_wait_time(&events),
            review_active_time: self.review_active_time(&events),
            created_hour: pr.created_at.hour(),
            merged_hour: pr.merged_at.map(|t| t.hour()),
        }
    }

    fn time_to_first_review(
        &self,
        pr: &PullRequestRecord,
        events: &[&ReviewEvent],
    ) -> Option<Duration> {
        events
            .iter()
            .find(|e| e.kind.is_review_response())
            .map(|e| e.created_at)
            .or(pr.first_reviewed_at)
            .map(|at| self.between(pr.created_at, at))
    }

    fn time_to_approval(&self, pr: &PullRequestRecord, events: &[&ReviewEvent]) -> Option<Duration> {
        events
            .iter()
            .find(|e| e.kind == ReviewEventKind::Approved)
            .map(|e| e.created_at)
            .or(pr.last_approved_at)
            .map(|at| self.between(pr.created_at, at))
    }

    /// From the last approval to the merge
    fn time_to_merge(&self, pr: &PullRequestRecord, events: &[&ReviewEvent]) -> Option<Duration> {
        let merged_at = pr.merged_at?;
        let approved_at = events
            .iter()
            .rev()
            .find(|e| e.kind == ReviewEventKind::Approved)
            .map(|e| e.created_at)
            .or(pr.last_approved_at)?;
        Some(self.between(approved_at, merged_at))
    }

    fn total_cycle_time(&self, pr: &PullRequestRecord) -> Option<Duration> {
        pr.merged_at.map(|merged| self.between(pr.created_at, merged))
    }

    /// Sum of request -> next response intervals
    fn review_wait_time(&self, events: &[&ReviewEvent]) -> Option<Duration> {
        let (total, pairs, _) = events.iter().fold(
            (Duration::zero(), 0usize, None::<DateTime<Utc>>),
            |(total, pairs, pending), event| match (&event.kind, pending) {
                (ReviewEventKind::Requested, None) => (total, pairs, Some(event.created_at)),
                (kind, Some(requested_at)) if kind.is_review_response() => (
                    total + self.between(requested_at, event.created_at),
                    pairs + 1,
                    None,
                ),
                _ => (total, pairs, pending),
            },
        );
        (pairs > 0).then_some(total)
    }

    /// Sum of short gaps between consecutive responses, floored at five minutes
    fn review_active_time(&self, events: &[&ReviewEvent]) -> Option<Duration> {
        let responses: Vec<DateTime<Utc>> = events
            .iter()
            .filter(|e| e.kind.is_review_response())
            .map(|e| e.created_at)
            .collect();
        if responses.is_empty() {
            return None;
        }

        let active = responses
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|gap| *gap <= Duration::hours(ACTIVE_REVIEW_GAP))
            .fold(Duration::zero(), |acc, gap| acc + gap);

        Some(active.max(Duration::minutes(MIN_ACTIVE_REVIEW_MINUTES)))
    }

    /// Interval between two instants, in wall-clock or business time
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
        if self.config.use_business_hours {
            self.business_time(start, end)
        } else {
            end - start
        }
    }

    fn business_time(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
        if start >= end {
            return Duration::zero();
        }

        let tz = self.config.timezone;
        let local_start = start.with_timezone(&tz).naive_local();
        let local_end = end.with_timezone(&tz).naive_local();

        let mut total = Duration::zero();
        let mut day = local_start.date();
        while day <= local_end.date() {
            let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
            if !(self.config.exclude_weekends && weekend) {
                let midnight: NaiveDateTime = day.and_time(NaiveTime::default());
                let open = midnight + Duration::hours(self.config.business_start_hour as i64);
                let close = midnight + Duration::hours(self.config.business_end_hour as i64);

                let from = local_start.max(open);
                let to = local_end.min(close);
                if from < to {
                    total = total + (to - from);
                }
            }
            day = day + Duration::days(1);
        }
        total
    }

    /// Duration statistics over a batch; PRs lacking a field are left out of that field
    pub fn calculate_statistics<'a, I>(&self, metrics: I) -> CycleTimeStatistics
    where
        I: IntoIterator<Item = &'a PrMetrics>,
    {
        let metrics: Vec<&PrMetrics> = metrics.into_iter().collect();
        let collect = |pick: fn(&TimeMetrics) -> Option<Duration>| -> Vec<Duration> {
            metrics.iter().filter_map(|m| pick(&m.time_metrics)).collect()
        };

        CycleTimeStatistics {
            total_prs: metrics.len(),
            stats: CycleTimeStats {
                total_cycle_time: stats::duration_stats(&collect(|t| t.total_cycle_time)),
                time_to_first_review: stats::duration_stats(&collect(|t| t.time_to_first_review)),
                time_to_approval: stats::duration_stats(&collect(|t| t.time_to_approval)),
                time_to_merge: stats::duration_stats(&collect(|t| t.time_to_merge)),
            },
        }
    }
}
