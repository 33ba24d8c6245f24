use crate::error::{ProcessingError, Result};
use crate::models::ColumnarRecord;
use crate::utils::constants::{
    DATE_FORMAT, DEFAULT_BATCH_SIZE, PARTITION_COLUMN, PARTITION_FILE_NAME,
};
use crate::writers::partition_dir;
use arrow::datatypes::SchemaRef;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::{self, File};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sorted dates of the complete partitions under `root`.
///
/// Only `date=YYYYMMDD` directories holding a data file count; staging and
/// trash directories left by an interrupted write are ignored.
pub fn list_partitions(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{}=", PARTITION_COLUMN);
    let mut dates = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(|n| n.strip_prefix(prefix.as_str())) else {
            continue;
        };
        if NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
            debug!("Ignoring directory {:?}", name);
            continue;
        }
        if entry.path().join(PARTITION_FILE_NAME).is_file() {
            dates.push(date.to_string());
        }
    }

    dates.sort();
    Ok(dates)
}

/// Read every row of the partition for `date`
pub fn read_partition<T: ColumnarRecord>(root: &Path, date: &str) -> Result<Vec<T>> {
    let path = partition_file(root, date)?;
    read_file(&path)
}

fn partition_file(root: &Path, date: &str) -> Result<PathBuf> {
    let path = partition_dir(root, date).join(PARTITION_FILE_NAME);
    if !path.is_file() {
        return Err(ProcessingError::MissingData(format!(
            "No partition for {} under {}",
            date,
            root.display()
        )));
    }
    Ok(path)
}

fn read_file<T: ColumnarRecord>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let expected = T::schema();
    let actual = builder.schema();
    let matches = expected.fields().len() == actual.fields().len()
        && expected
            .fields()
            .iter()
            .zip(actual.fields().iter())
            .all(|(e, a)| e.name() == a.name() && e.data_type() == a.data_type());
    if !matches {
        return Err(ProcessingError::Format(format!(
            "Unexpected schema in {}",
            path.display()
        )));
    }

    let reader = builder.with_batch_size(DEFAULT_BATCH_SIZE).build()?;
    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(T::from_batch(&batch?)?);
    }
    Ok(rows)
}

/// Arrow schema stored in the partition for `date`
pub fn partition_schema(root: &Path, date: &str) -> Result<SchemaRef> {
    let path = partition_file(root, date)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    Ok(builder.schema().clone())
}

/// Storage details of one partition file
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionInfo {
    pub date: String,
    pub rows: i64,
    pub row_groups: usize,
    pub file_size: u64,
}

pub fn partition_info(root: &Path, date: &str) -> Result<PartitionInfo> {
    let path = partition_file(root, date)?;
    let reader = SerializedFileReader::new(File::open(&path)?)?;
    let metadata = reader.metadata();

    Ok(PartitionInfo {
        date: date.to_string(),
        rows: metadata.file_metadata().num_rows(),
        row_groups: metadata.num_row_groups(),
        file_size: fs::metadata(&path)?.len(),
    })
}

/// Iterate the dataset one partition at a time
pub fn partitions<T: ColumnarRecord>(root: &Path) -> Result<PartitionIterator<T>> {
    Ok(PartitionIterator {
        root: root.to_path_buf(),
        dates: list_partitions(root)?.into_iter(),
        _marker: PhantomData,
    })
}

/// Yields `(date, rows)` for each partition in date order
pub struct PartitionIterator<T> {
    root: PathBuf,
    dates: std::vec::IntoIter<String>,
    _marker: PhantomData<T>,
}

impl<T: ColumnarRecord> Iterator for PartitionIterator<T> {
    type Item = Result<(String, Vec<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let date = self.dates.next()?;
        Some(read_partition(&self.root, &date).map(|rows| (date, rows)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.dates.size_hint()
    }
}
