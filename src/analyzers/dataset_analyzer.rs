use crate::error::{ProcessingError, Result};
use crate::models::{DerivedRow, JoinedRow};
use crate::processors::DerivedMetricEngine;
use crate::readers::partitions;
use crate::utils::constants::{
    COL_DEW_POINT, COL_HEAT_INDEX, COL_RELATIVE_HUMIDITY, COL_TEMPERATURE, COL_TEMPERATURE_F,
};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Aggregates of one numeric column, ignoring missing values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub present: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(skip)]
    sum: f64,
}

impl ColumnStats {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            present: 0,
            missing: 0,
            mean: None,
            min: None,
            max: None,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        match value.filter(|v| v.is_finite()) {
            Some(v) => {
                self.present += 1;
                self.sum += v;
                self.mean = Some(self.sum / self.present as f64);
                self.min = Some(self.min.map_or(v, |m| m.min(v)));
                self.max = Some(self.max.map_or(v, |m| m.max(v)));
            }
            None => self.missing += 1,
        }
    }

    pub fn missing_percentage(&self) -> f64 {
        let total = self.present + self.missing;
        if total == 0 {
            0.0
        } else {
            self.missing as f64 / total as f64 * 100.0
        }
    }

    fn line(&self) -> String {
        match (self.mean, self.min, self.max) {
            (Some(mean), Some(min), Some(max)) => format!(
                "- {}: mean {:.2}, min {:.2}, max {:.2} ({} present, {:.1}% missing)",
                self.name,
                mean,
                min,
                max,
                self.present,
                self.missing_percentage()
            ),
            _ => format!("- {}: no valid values ({} missing)", self.name, self.missing),
        }
    }
}

/// Hottest cell seen by the heat index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extreme {
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStatistics {
    pub partitions: usize,
    pub total_rows: usize,
    pub complete_rows: usize,
    pub date_range: (String, String),
    pub bounds: GridBounds,
    pub columns: Vec<ColumnStats>,
    pub max_heat_index: Option<Extreme>,
}

impl DatasetStatistics {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Partitions: {} ({} to {})\n\
            Rows: {} total, {} with both variables\n\
            Coverage: x {:.4} to {:.4}, y {:.4} to {:.4}\n\
            Columns:",
            self.partitions,
            self.date_range.0,
            self.date_range.1,
            self.total_rows,
            self.complete_rows,
            self.bounds.min_x,
            self.bounds.max_x,
            self.bounds.min_y,
            self.bounds.max_y
        );
        for column in &self.columns {
            summary.push('\n');
            summary.push_str(&column.line());
        }
        if let Some(ref hottest) = self.max_heat_index {
            summary.push_str(&format!(
                "\nHighest heat index: {:.1}°F at ({}, {}) on {}",
                hottest.value, hottest.x, hottest.y, hottest.date
            ));
        }
        summary
    }
}

/// Per-column statistics over a partitioned dataset, one partition in
/// memory at a time.
pub struct DatasetAnalyzer;

impl DatasetAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyse the joined dataset at `root`. With an engine, the derived
    /// columns are computed per partition and included.
    pub fn analyze(
        &self,
        root: &Path,
        engine: Option<&DerivedMetricEngine>,
    ) -> Result<DatasetStatistics> {
        let mut accumulator = Accumulator::new(engine.is_some());

        for partition in partitions::<JoinedRow>(root)? {
            let (date, rows) = partition?;
            debug!("Analysing partition {} ({} rows)", date, rows.len());
            accumulator.partition(&date);

            match engine {
                Some(engine) => {
                    for row in engine.derive_table(&rows) {
                        accumulator.push_derived(&row);
                    }
                }
                None => {
                    for row in &rows {
                        accumulator.push_joined(row);
                    }
                }
            }
        }

        accumulator.finish(root)
    }

    /// Analyse a dataset that already stores the derived columns
    pub fn analyze_derived(&self, root: &Path) -> Result<DatasetStatistics> {
        let mut accumulator = Accumulator::new(true);

        for partition in partitions::<DerivedRow>(root)? {
            let (date, rows) = partition?;
            accumulator.partition(&date);
            for row in &rows {
                accumulator.push_derived(row);
            }
        }

        accumulator.finish(root)
    }
}

impl Default for DatasetAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

struct Accumulator {
    partitions: usize,
    total_rows: usize,
    complete_rows: usize,
    first_date: Option<String>,
    last_date: Option<String>,
    bounds: Option<GridBounds>,
    columns: Vec<ColumnStats>,
    max_heat_index: Option<Extreme>,
}

impl Accumulator {
    fn new(derived: bool) -> Self {
        let mut names = vec![COL_TEMPERATURE, COL_DEW_POINT];
        if derived {
            names.extend([COL_RELATIVE_HUMIDITY, COL_TEMPERATURE_F, COL_HEAT_INDEX]);
        }
        Self {
            partitions: 0,
            total_rows: 0,
            complete_rows: 0,
            first_date: None,
            last_date: None,
            bounds: None,
            columns: names.into_iter().map(ColumnStats::new).collect(),
            max_heat_index: None,
        }
    }

    // Partitions arrive in date order
    fn partition(&mut self, date: &str) {
        self.partitions += 1;
        if self.first_date.is_none() {
            self.first_date = Some(date.to_string());
        }
        self.last_date = Some(date.to_string());
    }

    fn push_cell(&mut self, x: f64, y: f64, temperature: Option<f64>, dew_point: Option<f64>) {
        self.total_rows += 1;
        if temperature.is_some() && dew_point.is_some() {
            self.complete_rows += 1;
        }

        let bounds = self.bounds.get_or_insert(GridBounds {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        });
        bounds.min_x = bounds.min_x.min(x);
        bounds.max_x = bounds.max_x.max(x);
        bounds.min_y = bounds.min_y.min(y);
        bounds.max_y = bounds.max_y.max(y);

        self.columns[0].push(temperature);
        self.columns[1].push(dew_point);
    }

    fn push_joined(&mut self, row: &JoinedRow) {
        self.push_cell(row.x, row.y, row.temperature, row.dew_point);
    }

    fn push_derived(&mut self, row: &DerivedRow) {
        self.push_cell(row.x, row.y, row.temperature, row.dew_point);
        self.columns[2].push(row.relative_humidity);
        self.columns[3].push(row.temperature_f);
        self.columns[4].push(row.heat_index);

        if let Some(value) = row.heat_index.filter(|v| v.is_finite()) {
            if self.max_heat_index.as_ref().map_or(true, |m| value > m.value) {
                self.max_heat_index = Some(Extreme {
                    value,
                    x: row.x,
                    y: row.y,
                    date: row.date.clone(),
                });
            }
        }
    }

    fn finish(self, root: &Path) -> Result<DatasetStatistics> {
        let (Some(first), Some(last), Some(bounds)) = (self.first_date, self.last_date, self.bounds)
        else {
            return Err(ProcessingError::MissingData(format!(
                "No partitions with rows under {}",
                root.display()
            )));
        };

        Ok(DatasetStatistics {
            partitions: self.partitions,
            total_rows: self.total_rows,
            complete_rows: self.complete_rows,
            date_range: (first, last),
            bounds,
            columns: self.columns,
            max_heat_index: self.max_heat_index,
        })
    }
}
