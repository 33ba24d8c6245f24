pub mod dataset_analyzer;

pub use dataset_analyzer::{ColumnStats, DatasetAnalyzer, DatasetStatistics, Extreme, GridBounds};
