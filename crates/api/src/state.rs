//! Application state

use common::Config;
use processor::{AnalysisConfig, MetricsAggregator, PrAnalysisService};
use sqlx::PgPool;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub service: PrAnalysisService,
    pub aggregator: MetricsAggregator,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let service = PrAnalysisService::new(AnalysisConfig::from(&config));
        Self {
            config,
            pool,
            service,
            aggregator: MetricsAggregator::default(),
        }
    }
}
