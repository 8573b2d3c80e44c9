//! PR metrics engine: statistics, per-PR analysis, rollups and collection

pub mod aggregator;
pub mod analysis;
pub mod collect;
pub mod complexity;
pub mod cycle_time;
pub mod quality;
pub mod stats;
pub mod sync;


pub use aggregator::MetricsAggregator;
pub use analysis::{AnalysisConfig, PrAnalysisService};
pub use collect::{CollectError, CollectProgress, Collector};
pub use complexity::ComplexityAnalyzer;
pub use cycle_time::CycleTimeCalculator;
pub use quality::QualityAnalyzer;
pub use sync::{SyncConfig, SyncService};
