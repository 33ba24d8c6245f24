use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Raster format error: {0}")]
    Format(String),

    #[error("Metadata parse error for '{identifier}': {reason}")]
    MetadataParse { identifier: String, reason: String },

    #[error("Pairing error: {temperature} temperature files vs {dewpoint} dew-point files")]
    Pairing { temperature: usize, dewpoint: usize },

    #[error("Join input spans multiple dates: {}", .0.join(", "))]
    MultipleDates(Vec<String>),

    #[error("Arithmetic domain error: {0}")]
    ArithmeticDomain(String),

    #[error("Partition for {date} already exists at {path}")]
    PartitionExists { date: String, path: String },

    #[error("Date {0} was already claimed by another pair in this run")]
    DuplicateDate(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid identifier pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Processing cancelled by user")]
    Cancelled,

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Stable label used when failures are recorded in ingest reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Io(_) => "io",
            ProcessingError::Format(_) => "format",
            ProcessingError::MetadataParse { .. } => "metadata_parse",
            ProcessingError::Pairing { .. } => "pairing",
            ProcessingError::MultipleDates(_) => "multiple_dates",
            ProcessingError::ArithmeticDomain(_) => "arithmetic_domain",
            ProcessingError::PartitionExists { .. } => "partition_exists",
            ProcessingError::DuplicateDate(_) => "duplicate_date",
            ProcessingError::MissingData(_) => "missing_data",
            ProcessingError::DateParse(_) => "date_parse",
            ProcessingError::Parquet(_) => "parquet",
            ProcessingError::Arrow(_) => "arrow",
            ProcessingError::Config(_)
            | ProcessingError::ConfigSource(_)
            | ProcessingError::Validation(_)
            | ProcessingError::Regex(_) => "config",
            ProcessingError::Json(_) => "json",
            ProcessingError::Cancelled => "cancelled",
            ProcessingError::TaskJoin(_) => "task_join",
        }
    }

    pub(crate) fn metadata(identifier: &str, reason: impl Into<String>) -> Self {
        ProcessingError::MetadataParse {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<tiff::TiffError> for ProcessingError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(e) => ProcessingError::Io(e),
            other => ProcessingError::Format(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ProcessingError::Pairing {
                temperature: 2,
                dewpoint: 1
            }
            .kind(),
            "pairing"
        );
        assert_eq!(
            ProcessingError::metadata("abc", "no date").kind(),
            "metadata_parse"
        );
        assert_eq!(ProcessingError::Format("bad".into()).kind(), "format");
    }

    #[test]
    fn test_multiple_dates_message() {
        let err = ProcessingError::MultipleDates(vec!["20200101".into(), "20200102".into()]);
        assert_eq!(
            err.to_string(),
            "Join input spans multiple dates: 20200101, 20200102"
        );
    }

    #[test]
    fn test_tiff_io_error_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ProcessingError = tiff::TiffError::IoError(io).into();
        assert!(matches!(err, ProcessingError::Io(_)));
    }
}
