use crate::config::{OverwritePolicy, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::ColumnarRecord;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DATE_FORMAT, DEFAULT_BATCH_SIZE, DEFAULT_ROW_GROUP_SIZE, PARTITION_COLUMN,
    PARTITION_FILE_NAME, STAGING_PREFIX, TRASH_PREFIX,
};
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of a single partition write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
    Written { path: PathBuf, rows: usize },
    Skipped { path: PathBuf },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written { path, .. } | WriteOutcome::Skipped { path } => path,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Directory holding the partition for `date` under `root`
pub fn partition_dir(root: &Path, date: &str) -> PathBuf {
    root.join(format!("{}={}", PARTITION_COLUMN, date))
}

/// Publishes one Parquet partition per date.
///
/// Data is written into a `.staging-*` directory inside the destination root,
/// synced, and renamed into `date=YYYYMMDD/`. A partition being replaced is
/// moved into a `.trash-*` directory first and removed once the new one is
/// in place, so readers only ever see a complete partition or none.
pub struct PartitionWriter {
    compression: Compression,
    row_group_size: usize,
}

impl PartitionWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new()
            .with_compression(&config.compression)?
            .with_row_group_size(config.row_group_size))
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Persist `rows` as the partition for `date` under `root`
    pub fn write<T: ColumnarRecord>(
        &self,
        rows: &[T],
        date: &str,
        root: &Path,
        policy: OverwritePolicy,
    ) -> Result<WriteOutcome> {
        NaiveDate::parse_from_str(date, DATE_FORMAT)?;
        fs::create_dir_all(root)?;

        let target = partition_dir(root, date);
        let exists = target.exists();
        if exists {
            match policy {
                OverwritePolicy::SkipIfExists => {
                    info!("Partition {} exists, skipping", date);
                    return Ok(WriteOutcome::Skipped { path: target });
                }
                OverwritePolicy::FailIfExists => {
                    return Err(ProcessingError::PartitionExists {
                        date: date.to_string(),
                        path: target.display().to_string(),
                    });
                }
                OverwritePolicy::Overwrite => {
                    debug!("Partition {} exists and will be replaced", date);
                }
            }
        }

        // Removed on drop unless the rename below succeeds
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)?;
        let staged = staging.path().join(PARTITION_COLUMN);
        fs::create_dir(&staged)?;
        self.write_file(rows, &staged.join(PARTITION_FILE_NAME))?;

        if exists {
            let trash = tempfile::Builder::new()
                .prefix(TRASH_PREFIX)
                .tempdir_in(root)?;
            let displaced = trash.path().join(PARTITION_COLUMN);
            fs::rename(&target, &displaced)?;
            if let Err(e) = fs::rename(&staged, &target) {
                fs::rename(&displaced, &target)?;
                return Err(e.into());
            }
            drop(trash);
        } else {
            fs::rename(&staged, &target)?;
        }
        sync_dir(root)?;

        info!("Wrote partition {} ({} rows)", date, rows.len());
        Ok(WriteOutcome::Written {
            path: target,
            rows: rows.len(),
        })
    }

    fn write_file<T: ColumnarRecord>(&self, rows: &[T], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, T::schema(), Some(props))?;
        for chunk in rows.chunks(DEFAULT_BATCH_SIZE) {
            let batch = T::to_batch(chunk)?;
            writer.write(&batch)?;
        }
        writer.close()?;

        File::open(path)?.sync_all()?;
        Ok(())
    }
}

impl Default for PartitionWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
