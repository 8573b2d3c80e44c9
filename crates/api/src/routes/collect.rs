//! Collection trigger

use axum::{
    extract::{Path, State},
    Json,
};
use processor::{AnalysisConfig, CollectProgress, Collector};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub repository: String,
    #[serde(flatten)]
    pub progress: CollectProgress,
}

/// Collect, analyze and store recent PRs for a repository
/// POST /api/collect/:owner/:name
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<Json<CollectResponse>> {
    info!("Collection requested for {}/{}", owner, name);

    let collector = Collector::new(
        state.pool.clone(),
        state.config.github_token.clone(),
        state.config.max_age_days,
        AnalysisConfig::from(&state.config),
    );
    let progress = collector.collect_repo(&owner, &name).await?;

    Ok(Json(CollectResponse {
        repository: format!("{}/{}", owner, name),
        progress,
    }))
}
