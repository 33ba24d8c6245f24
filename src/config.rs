//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `GRID_HEAT_*` environment variables (`__` separates nested keys, e.g.
//! `GRID_HEAT_IDENTIFIER__PREFIX`). CLI flags are applied on top by the
//! caller. The resulting struct is passed explicitly to every stage.

use crate::error::{ProcessingError, Result};
use crate::processors::derived_metrics::TemperatureUnit;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DATE_FORMAT, DEFAULT_COORDINATE_PRECISION, DEFAULT_DESTINATION_ROOT, DEFAULT_ROW_GROUP_SIZE,
};
use crate::utils::coordinates::validate_precision;
use crate::utils::identifier::IdentifierPattern;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

pub const ENV_PREFIX: &str = "GRID_HEAT";

/// What to do when the partition for a date already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Leave the existing partition untouched and report the date as skipped
    #[default]
    SkipIfExists,
    /// Replace the existing partition wholesale
    Overwrite,
    /// Treat an existing partition as an error for that date
    FailIfExists,
}

impl std::fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OverwritePolicy::SkipIfExists => "skip-if-exists",
            OverwritePolicy::Overwrite => "overwrite",
            OverwritePolicy::FailIfExists => "fail-if-exists",
        };
        f.write_str(name)
    }
}

/// Inclusive range of `YYYYMMDD` dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: &str, end: &str) -> Result<Self> {
        let range = Self {
            start: start.to_string(),
            end: end.to_string(),
        };
        range.check()?;
        Ok(range)
    }

    pub fn check(&self) -> Result<()> {
        let start = NaiveDate::parse_from_str(&self.start, DATE_FORMAT)?;
        let end = NaiveDate::parse_from_str(&self.end, DATE_FORMAT)?;
        if start > end {
            return Err(ProcessingError::Config(format!(
                "Date range start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// `YYYYMMDD` strings order the same way as the dates they encode
    pub fn contains(&self, date: &str) -> bool {
        self.start.as_str() <= date && date <= self.end.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    pub destination_root: PathBuf,

    pub overwrite_policy: OverwritePolicy,

    #[validate(range(max = 12))]
    pub coordinate_precision: u32,

    pub date_range: Option<DateRange>,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    pub compression: String,

    #[validate(range(min = 1))]
    pub row_group_size: usize,

    pub identifier: IdentifierPattern,

    pub input_unit: TemperatureUnit,

    pub high_humidity_adjustment: bool,

    pub use_mmap: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from(DEFAULT_DESTINATION_ROOT),
            overwrite_policy: OverwritePolicy::default(),
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            date_range: None,
            max_workers: num_cpus::get(),
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            identifier: IdentifierPattern::default(),
            input_unit: TemperatureUnit::default(),
            high_humidity_adjustment: false,
            use_mmap: false,
        }
    }
}

impl PipelineConfig {
    /// Load defaults, the optional file at `path`, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Field ranges plus the cross-field rules `validator` cannot express
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        validate_precision(self.coordinate_precision)?;

        if let Some(range) = &self.date_range {
            range.check()?;
        }

        let known = [
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ];
        if !known.contains(&self.compression.to_lowercase().as_str()) {
            return Err(ProcessingError::Config(format!(
                "Unsupported compression: {}",
                self.compression
            )));
        }

        self.identifier.compile()?;
        Ok(())
    }
}
