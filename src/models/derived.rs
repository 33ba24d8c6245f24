use crate::error::Result;
use crate::models::columnar::{f64_column, optional, utf8_column, ColumnarRecord};
use crate::models::joined::JoinedRow;
use crate::utils::constants::{
    COL_DATE, COL_DEW_POINT, COL_HEAT_INDEX, COL_RELATIVE_HUMIDITY, COL_TEMPERATURE,
    COL_TEMPERATURE_F, COL_X, COL_Y,
};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static DERIVED_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let mut fields: Vec<Field> = JoinedRow::schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(COL_RELATIVE_HUMIDITY, DataType::Float64, true));
    fields.push(Field::new(COL_TEMPERATURE_F, DataType::Float64, true));
    fields.push(Field::new(COL_HEAT_INDEX, DataType::Float64, true));
    Arc::new(Schema::new(fields))
});

/// A joined row extended with the derived humidity and heat-index columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
    pub x: f64,
    pub y: f64,
    pub date: String,
    pub temperature: Option<f64>,
    pub dew_point: Option<f64>,
    /// Percent
    pub relative_humidity: Option<f64>,
    pub temperature_f: Option<f64>,
    /// Degrees Fahrenheit
    pub heat_index: Option<f64>,
}

impl ColumnarRecord for DerivedRow {
    fn schema() -> SchemaRef {
        DERIVED_SCHEMA.clone()
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch> {
        let column = |f: fn(&DerivedRow) -> Option<f64>| -> Arc<Float64Array> {
            Arc::new(records.iter().map(f).collect::<Float64Array>())
        };

        let xs: Vec<f64> = records.iter().map(|r| r.x).collect();
        let ys: Vec<f64> = records.iter().map(|r| r.y).collect();
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();

        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Float64Array::from(xs)),
                Arc::new(Float64Array::from(ys)),
                Arc::new(StringArray::from(dates)),
                column(|r| r.temperature),
                column(|r| r.dew_point),
                column(|r| r.relative_humidity),
                column(|r| r.temperature_f),
                column(|r| r.heat_index),
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
        let humidity = f64_column(batch, COL_RELATIVE_HUMIDITY)?;
        let temperatures_f = f64_column(batch, COL_TEMPERATURE_F)?;
        let heat_index = f64_column(batch, COL_HEAT_INDEX)?;

        Ok((0..batch.num_rows())
            .map(|i| DerivedRow {
                x: xs.value(i),
                y: ys.value(i),
                date: dates.value(i).to_string(),
                temperature: optional(temperatures, i),
                dew_point: optional(dew_points, i),
                relative_humidity: optional(humidity, i),
                temperature_f: optional(temperatures_f, i),
                heat_index: optional(heat_index, i),
            })
            .collect())
    }
}
