//! Relative humidity and heat index per grid cell.
//!
//! Relative humidity uses the Magnus approximation of saturation vapour
//! pressure. The heat index follows the NWS procedure: Steadman's simple
//! estimate, the Rothfusz regression when the simple estimate averaged with
//! the temperature reaches 80 °F, and the optional humidity adjustments on top
//! of the regression.

use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{DerivedRow, JoinedRow};
use crate::utils::constants::{HEAT_INDEX_REGRESSION_THRESHOLD, KELVIN_OFFSET, MAGNUS_A, MAGNUS_B};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unit the raster archive publishes temperatures in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Kelvin => value - KELVIN_OFFSET,
        }
    }
}

/// Corrections applied on top of the Rothfusz regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeatIndexAdjustment {
    /// RH < 13 % and 80 °F < T < 112 °F: subtract
    LowHumidity,
    /// RH > 85 % and 80 °F < T < 87 °F: add
    HighHumidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatIndexBranch {
    Simple,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatIndexEstimate {
    /// Degrees Fahrenheit
    pub value: f64,
    pub branch: HeatIndexBranch,
    /// Regression value before adjustments; `None` on the simple branch
    pub regression: Option<f64>,
}

fn magnus(t: f64) -> Result<f64> {
    let denominator = MAGNUS_B + t;
    if denominator == 0.0 {
        return Err(ProcessingError::ArithmeticDomain(format!(
            "Magnus term undefined at {} °C",
            t
        )));
    }
    Ok(MAGNUS_A * t / denominator)
}

/// Relative humidity in percent from air temperature and dew point in °C.
///
/// Not clamped: a dew point above the air temperature yields more than 100.
pub fn relative_humidity(temperature_c: f64, dew_point_c: f64) -> Result<f64> {
    if !temperature_c.is_finite() || !dew_point_c.is_finite() {
        return Err(ProcessingError::ArithmeticDomain(
            "Non-finite humidity input".to_string(),
        ));
    }

    let rh = 100.0 * (magnus(dew_point_c)? - magnus(temperature_c)?).exp();
    if !rh.is_finite() {
        return Err(ProcessingError::ArithmeticDomain(format!(
            "Relative humidity overflow for T={} Td={}",
            temperature_c, dew_point_c
        )));
    }
    Ok(rh)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

fn simple_heat_index(t: f64, rh: f64) -> f64 {
    0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094)
}

fn rothfusz(t: f64, rh: f64) -> f64 {
    let t2 = t * t;
    let rh2 = rh * rh;
    -42.379 + 2.04901523 * t + 10.14333127 * rh
        - 0.22475541 * t * rh
        - 0.00683783 * t2
        - 0.05481717 * rh2
        + 0.00122874 * t2 * rh
        + 0.00085282 * t * rh2
        - 0.00000199 * t2 * rh2
}

/// Heat index in °F with the branch that produced it
pub fn heat_index_estimate(
    temperature_f: f64,
    relative_humidity: f64,
    adjustments: &[HeatIndexAdjustment],
) -> Result<HeatIndexEstimate> {
    let (t, rh) = (temperature_f, relative_humidity);
    if !t.is_finite() || !rh.is_finite() {
        return Err(ProcessingError::ArithmeticDomain(
            "Non-finite heat index input".to_string(),
        ));
    }

    let simple = simple_heat_index(t, rh);
    if (simple + t) / 2.0 < HEAT_INDEX_REGRESSION_THRESHOLD {
        return Ok(HeatIndexEstimate {
            value: simple,
            branch: HeatIndexBranch::Simple,
            regression: None,
        });
    }

    let regression = rothfusz(t, rh);
    let mut value = regression;
    for adjustment in adjustments {
        match adjustment {
            HeatIndexAdjustment::LowHumidity if rh < 13.0 && t > 80.0 && t < 112.0 => {
                value -= ((13.0 - rh) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
            }
            HeatIndexAdjustment::HighHumidity if rh > 85.0 && t > 80.0 && t < 87.0 => {
                value += ((rh - 85.0) / 10.0) * ((87.0 - t) / 5.0);
            }
            _ => {}
        }
    }

    if !value.is_finite() {
        return Err(ProcessingError::ArithmeticDomain(format!(
            "Heat index overflow for T={} RH={}",
            t, rh
        )));
    }

    Ok(HeatIndexEstimate {
        value,
        branch: HeatIndexBranch::Regression,
        regression: Some(regression),
    })
}

pub fn heat_index(
    temperature_f: f64,
    relative_humidity: f64,
    adjustments: &[HeatIndexAdjustment],
) -> Result<f64> {
    heat_index_estimate(temperature_f, relative_humidity, adjustments).map(|e| e.value)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    pub relative_humidity: Option<f64>,
    pub temperature_f: Option<f64>,
    pub heat_index: Option<f64>,
}

/// Applies the derivations row by row. Missing inputs and domain failures
/// produce missing outputs for that row only.
#[derive(Debug, Clone)]
pub struct DerivedMetricEngine {
    unit: TemperatureUnit,
    adjustments: Vec<HeatIndexAdjustment>,
}

impl DerivedMetricEngine {
    pub fn new() -> Self {
        Self {
            unit: TemperatureUnit::Celsius,
            adjustments: vec![HeatIndexAdjustment::LowHumidity],
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new()
            .with_unit(config.input_unit)
            .with_high_humidity_adjustment(config.high_humidity_adjustment)
    }

    pub fn with_unit(mut self, unit: TemperatureUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_high_humidity_adjustment(mut self, enabled: bool) -> Self {
        self.adjustments
            .retain(|a| *a != HeatIndexAdjustment::HighHumidity);
        if enabled {
            self.adjustments.push(HeatIndexAdjustment::HighHumidity);
        }
        self
    }

    pub fn with_adjustments(mut self, adjustments: Vec<HeatIndexAdjustment>) -> Self {
        self.adjustments = adjustments;
        self
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn adjustments(&self) -> &[HeatIndexAdjustment] {
        &self.adjustments
    }

    pub fn derive(&self, temperature: Option<f64>, dew_point: Option<f64>) -> DerivedMetrics {
        let t_c = temperature
            .filter(|v| v.is_finite())
            .map(|v| self.unit.to_celsius(v));
        let td_c = dew_point
            .filter(|v| v.is_finite())
            .map(|v| self.unit.to_celsius(v));

        let temperature_f = t_c.map(celsius_to_fahrenheit);

        let relative_humidity = match (t_c, td_c) {
            (Some(t), Some(td)) => relative_humidity(t, td)
                .map_err(|e| debug!("{}", e))
                .ok(),
            _ => None,
        };

        let heat_index = match (temperature_f, relative_humidity) {
            (Some(t), Some(rh)) => heat_index(t, rh, &self.adjustments)
                .map_err(|e| debug!("{}", e))
                .ok(),
            _ => None,
        };

        DerivedMetrics {
            relative_humidity,
            temperature_f,
            heat_index,
        }
    }

    pub fn derive_row(&self, row: &JoinedRow) -> DerivedRow {
        let metrics = self.derive(row.temperature, row.dew_point);
        DerivedRow {
            x: row.x,
            y: row.y,
            date: row.date.clone(),
            temperature: row.temperature,
            dew_point: row.dew_point,
            relative_humidity: metrics.relative_humidity,
            temperature_f: metrics.temperature_f,
            heat_index: metrics.heat_index,
        }
    }

    /// Derive a whole table in parallel, preserving row order
    pub fn derive_table(&self, rows: &[JoinedRow]) -> Vec<DerivedRow> {
        rows.par_iter().map(|row| self.derive_row(row)).collect()
    }
}

impl Default for DerivedMetricEngine {
    fn default() -> Self {
        Self::new()
    }
}
