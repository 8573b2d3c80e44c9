//! Per-PR metrics storage

use chrono::{DateTime, Utc};
use common::models::PrMetrics;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Row};
use tracing::debug;

fn from_row(row: &PgRow) -> Result<PrMetrics, sqlx::Error> {
    let Json(metrics) = row.try_get::<Json<PrMetrics>, _>("metrics")?;
    Ok(metrics)
}

/// Insert or replace the metrics of one PR
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    metrics: &PrMetrics,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pr_metrics (pr_id, pr_number, title, author, repository, created_at, merged_at,
                                lines_changed, size_category, complexity_score, total_cycle_time_ms,
                                metrics, collected_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
        ON CONFLICT (pr_id) DO UPDATE
        SET title = EXCLUDED.title,
            merged_at = EXCLUDED.merged_at,
            lines_changed = EXCLUDED.lines_changed,
            size_category = EXCLUDED.size_category,
            complexity_score = EXCLUDED.complexity_score,
            total_cycle_time_ms = EXCLUDED.total_cycle_time_ms,
            metrics = EXCLUDED.metrics,
            collected_at = NOW()
        "#,
    )
    .bind(&metrics.pr_id)
    .bind(metrics.pr_number)
    .bind(&metrics.title)
    .bind(&metrics.author)
    .bind(&metrics.repository)
    .bind(metrics.created_at)
    .bind(metrics.merged_at)
    .bind(metrics.size_metrics.lines_changed)
    .bind(metrics.size_category.as_str())
    .bind(metrics.complexity_score)
    .bind(
        metrics
            .time_metrics
            .total_cycle_time
            .map(|d| d.num_milliseconds()),
    )
    .bind(Json(metrics))
    .execute(executor)
    .await?;
    Ok(())
}

/// Upsert a batch atomically
pub async fn upsert_batch(pool: &PgPool, batch: &[PrMetrics]) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for metrics in batch {
        upsert(&mut *tx, metrics).await?;
    }
    tx.commit().await?;
    debug!("Stored metrics for {} PRs", batch.len());
    Ok(batch.len())
}

pub async fn get_by_pr_id(pool: &PgPool, pr_id: &str) -> Result<Option<PrMetrics>, sqlx::Error> {
    let row = sqlx::query("SELECT metrics FROM pr_metrics WHERE pr_id = $1")
        .bind(pr_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// PRs created within `[start, end]`, oldest first.
/// Empty `developers` or `repositories` slices apply no filter.
pub async fn list_by_date_range(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    developers: &[String],
    repositories: &[String],
) -> Result<Vec<PrMetrics>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT metrics
        FROM pr_metrics
        WHERE created_at >= $1 AND created_at <= $2
          AND (cardinality($3::text[]) = 0 OR author = ANY($3))
          AND (cardinality($4::text[]) = 0 OR repository = ANY($4))
        ORDER BY created_at ASC, pr_id ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(developers)
    .bind(repositories)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Delete metrics collected before `cutoff`, returning the number removed
pub async fn delete_collected_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pr_metrics WHERE collected_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
