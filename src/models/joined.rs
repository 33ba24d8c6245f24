use crate::error::Result;
use crate::models::columnar::{f64_column, optional, utf8_column, ColumnarRecord};
use crate::models::grid_cell::CellKey;
use crate::utils::constants::{COL_DATE, COL_DEW_POINT, COL_TEMPERATURE, COL_X, COL_Y};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static JOINED_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(COL_X, DataType::Float64, false),
        Field::new(COL_Y, DataType::Float64, false),
        Field::new(COL_DATE, DataType::Utf8, false),
        Field::new(COL_TEMPERATURE, DataType::Float64, true),
        Field::new(COL_DEW_POINT, DataType::Float64, true),
    ]))
});

/// One grid cell on one day with both variables side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRow {
    pub x: f64,
    pub y: f64,
    pub date: String,
    pub temperature: Option<f64>,
    pub dew_point: Option<f64>,
}

impl JoinedRow {
    pub fn new(
        x: f64,
        y: f64,
        date: String,
        temperature: Option<f64>,
        dew_point: Option<f64>,
    ) -> Self {
        Self {
            x,
            y,
            date,
            temperature,
            dew_point,
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.x, self.y, &self.date)
    }

    pub fn is_complete(&self) -> bool {
        self.temperature.is_some() && self.dew_point.is_some()
    }
}

impl ColumnarRecord for JoinedRow {
    fn schema() -> SchemaRef {
        JOINED_SCHEMA.clone()
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch> {
        let xs: Vec<f64> = records.iter().map(|r| r.x).collect();
        let ys: Vec<f64> = records.iter().map(|r| r.y).collect();
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        let temperatures: Vec<Option<f64>> = records.iter().map(|r| r.temperature).collect();
        let dew_points: Vec<Option<f64>> = records.iter().map(|r| r.dew_point).collect();

        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Float64Array::from(xs)),
                Arc::new(Float64Array::from(ys)),
                Arc::new(StringArray::from(dates)),
                Arc::new(Float64Array::from(temperatures)),
                Arc::new(Float64Array::from(dew_points)),
            ],
        )?;

        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let xs = f64_column(batch, COL_X)?;
        let ys = f64_column(batch, COL_Y)?;
        let dates = utf8_column(batch, COL_DATE)?;
        let temperatures = f64_column(batch, COL_TEMPERATURE)?;
        let dew_points = f64_column(batch, COL_DEW_POINT)?;

        Ok((0..batch.num_rows())
            .map(|i| JoinedRow {
                x: xs.value(i),
                y: ys.value(i),
                date: dates.value(i).to_string(),
                temperature: optional(temperatures, i),
                dew_point: optional(dew_points, i),
            })
            .collect())
    }
}
