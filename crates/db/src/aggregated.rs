//! Aggregated metrics storage
//!
//! Rollups are keyed by level, period, target and date range. Saving the same
//! key again replaces the data and bumps `version`.

use chrono::{DateTime, Utc};
use common::rollups::{
    AggregationPeriod, DeveloperMetrics, MetricsSummary, RepositoryMetrics, TeamMetrics,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Level a rollup was computed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationLevel {
    Team,
    Developer,
    Repository,
}

impl AggregationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationLevel::Team => "team",
            AggregationLevel::Developer => "developer",
            AggregationLevel::Repository => "repository",
        }
    }
}

/// Team rollups have no target
const TEAM_TARGET: &str = "";

async fn save<T: Serialize + Sync>(
    pool: &PgPool,
    level: AggregationLevel,
    target_id: &str,
    summary: &MetricsSummary,
    data: &T,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO aggregated_metrics (id, aggregation_level, period, target_id, period_start,
                                        period_end, total_prs, data, version, generated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9)
        ON CONFLICT (aggregation_level, period, target_id, period_start, period_end) DO UPDATE
        SET total_prs = EXCLUDED.total_prs,
            data = EXCLUDED.data,
            generated_at = EXCLUDED.generated_at,
            version = aggregated_metrics.version + 1
        RETURNING version
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(level.as_str())
    .bind(summary.period.as_str())
    .bind(target_id)
    .bind(summary.date_range.start)
    .bind(summary.date_range.end)
    .bind(summary.total_prs as i64)
    .bind(Json(data))
    .bind(summary.generated_at)
    .fetch_one(pool)
    .await?;

    Ok(row.get("version"))
}

/// Most recently generated rollup whose range lies within `[start, end]`
async fn find<T: DeserializeOwned + Send + Unpin + 'static>(
    pool: &PgPool,
    level: AggregationLevel,
    target_id: &str,
    period: AggregationPeriod,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<T>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT data
        FROM aggregated_metrics
        WHERE aggregation_level = $1 AND target_id = $2 AND period = $3
          AND period_start >= $4 AND period_end <= $5
        ORDER BY generated_at DESC
        LIMIT 1
        "#,
    )
    .bind(level.as_str())
    .bind(target_id)
    .bind(period.as_str())
    .bind(start)
    .bind(end)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let Json(data) = row.try_get::<Json<T>, _>("data")?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

/// Save a team rollup, returning its version
pub async fn save_team(pool: &PgPool, team: &TeamMetrics) -> Result<i32, sqlx::Error> {
    save(pool, AggregationLevel::Team, TEAM_TARGET, &team.summary, team).await
}

pub async fn save_developer(
    pool: &PgPool,
    developer: &DeveloperMetrics,
) -> Result<i32, sqlx::Error> {
    save(
        pool,
        AggregationLevel::Developer,
        &developer.developer,
        &developer.summary,
        developer,
    )
    .await
}

pub async fn save_repository(
    pool: &PgPool,
    repository: &RepositoryMetrics,
) -> Result<i32, sqlx::Error> {
    save(
        pool,
        AggregationLevel::Repository,
        &repository.repository,
        &repository.summary,
        repository,
    )
    .await
}

pub async fn find_team(
    pool: &PgPool,
    period: AggregationPeriod,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<TeamMetrics>, sqlx::Error> {
    find(pool, AggregationLevel::Team, TEAM_TARGET, period, start, end).await
}

pub async fn find_developer(
    pool: &PgPool,
    developer: &str,
    period: AggregationPeriod,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<DeveloperMetrics>, sqlx::Error> {
    find(pool, AggregationLevel::Developer, developer, period, start, end).await
}

pub async fn find_repository(
    pool: &PgPool,
    repository: &str,
    period: AggregationPeriod,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<RepositoryMetrics>, sqlx::Error> {
    find(
        pool,
        AggregationLevel::Repository,
        repository,
        period,
        start,
        end,
    )
    .await
}

/// Delete rollups generated before `cutoff`, returning the number removed
pub async fn delete_generated_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM aggregated_metrics WHERE generated_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(AggregationLevel::Team.as_str(), "team");
        assert_eq!(AggregationLevel::Developer.as_str(), "developer");
        assert_eq!(AggregationLevel::Repository.as_str(), "repository");
    }

    #[test]
    fn test_stored_blob_roundtrips_through_json() {
        let team = TeamMetrics {
            summary: MetricsSummary::empty(AggregationPeriod::Monthly, Utc::now()),
        };
        let blob = serde_json::to_value(&team).unwrap();
        let back: TeamMetrics = serde_json::from_value(blob).unwrap();
        assert_eq!(back, team);
    }
}
