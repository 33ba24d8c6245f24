use crate::error::{ProcessingError, Result};
use arrow::array::{Array, Float64Array, StringArray};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// A row type with a fixed Arrow schema, so it can be persisted as a
/// partition and read back without loss.
pub trait ColumnarRecord: Sized + Send + Sync {
    fn schema() -> SchemaRef;

    fn to_batch(records: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

pub(crate) fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProcessingError::Format(format!("Missing column '{}'", name)))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ProcessingError::Format(format!("Invalid {} column type", name)))
}

pub(crate) fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProcessingError::Format(format!("Missing column '{}'", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ProcessingError::Format(format!("Invalid {} column type", name)))
}

pub(crate) fn optional(array: &Float64Array, i: usize) -> Option<f64> {
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}
