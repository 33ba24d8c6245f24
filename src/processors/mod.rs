pub mod derived_metrics;
pub mod ingest_orchestrator;
pub mod pair_joiner;

pub use derived_metrics::{
    celsius_to_fahrenheit, heat_index, heat_index_estimate, relative_humidity,
    DerivedMetricEngine, DerivedMetrics, HeatIndexAdjustment, HeatIndexBranch, HeatIndexEstimate,
    TemperatureUnit,
};
pub use ingest_orchestrator::{IngestOrchestrator, IngestReport, PairFailure, PairSuccess};
pub use pair_joiner::{JoinedTable, PairJoiner};
