use crate::error::{ProcessingError, Result};
use crate::utils::constants::MAX_COORDINATE_PRECISION;

/// Round a coordinate to `precision` decimal places.
///
/// Every reader goes through this function so that cells taken from
/// independently produced rasters compare equal by value. `-0.0` is
/// normalised to `0.0` so equal keys also hash equally.
///
/// # Examples
/// ```
/// use grid_heat_processor::utils::round_coordinate;
///
/// assert_eq!(round_coordinate(12.3456789, 5), 12.34568);
/// assert_eq!(round_coordinate(-0.000001, 5).to_bits(), 0.0f64.to_bits());
/// ```
pub fn round_coordinate(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn validate_precision(precision: u32) -> Result<()> {
    if precision > MAX_COORDINATE_PRECISION {
        return Err(ProcessingError::Config(format!(
            "Coordinate precision {} exceeds maximum of {}",
            precision, MAX_COORDINATE_PRECISION
        )));
    }
    Ok(())
}

/// Affine placement of a north-up raster, taken from the GeoTIFF
/// `ModelTiepointTag` and `ModelPixelScaleTag`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Model X of raster position (0, 0)
    pub origin_x: f64,
    /// Model Y of raster position (0, 0)
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    /// `PixelIsPoint` rasters address samples directly, `PixelIsArea`
    /// rasters report cell centres.
    pub pixel_is_point: bool,
}

impl GridGeometry {
    /// Build from the raw tag vectors. The tiepoint is `[I, J, K, X, Y, Z]`
    /// and the scale `[ScaleX, ScaleY, ScaleZ]`.
    pub fn from_tags(tiepoint: &[f64], scale: &[f64], pixel_is_point: bool) -> Result<Self> {
        if tiepoint.len() < 6 {
            return Err(ProcessingError::Format(format!(
                "ModelTiepointTag needs 6 values, got {}",
                tiepoint.len()
            )));
        }
        if scale.len() < 2 {
            return Err(ProcessingError::Format(format!(
                "ModelPixelScaleTag needs at least 2 values, got {}",
                scale.len()
            )));
        }

        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);

        if !(sx.is_finite() && sy.is_finite()) || sx <= 0.0 || sy <= 0.0 {
            return Err(ProcessingError::Format(format!(
                "Invalid pixel scale ({}, {})",
                sx, sy
            )));
        }

        Ok(Self {
            origin_x: x - i * sx,
            origin_y: y + j * sy,
            pixel_width: sx,
            pixel_height: sy,
            pixel_is_point,
        })
    }

    /// Build from a 4x4 row-major `ModelTransformationTag`. Only north-up
    /// grids (no rotation terms) are accepted.
    pub fn from_transformation(matrix: &[f64], pixel_is_point: bool) -> Result<Self> {
        if matrix.len() < 16 {
            return Err(ProcessingError::Format(format!(
                "ModelTransformationTag needs 16 values, got {}",
                matrix.len()
            )));
        }
        if matrix[1] != 0.0 || matrix[4] != 0.0 {
            return Err(ProcessingError::Format(
                "Rotated rasters are not supported".to_string(),
            ));
        }

        let tiepoint = [0.0, 0.0, 0.0, matrix[3], matrix[7], 0.0];
        Self::from_tags(&tiepoint, &[matrix[0], -matrix[5]], pixel_is_point)
    }

    /// Unrounded model coordinates for the sample at (`col`, `row`)
    pub fn position(&self, col: u32, row: u32) -> (f64, f64) {
        let offset = if self.pixel_is_point { 0.0 } else { 0.5 };
        let x = self.origin_x + (col as f64 + offset) * self.pixel_width;
        let y = self.origin_y - (row as f64 + offset) * self.pixel_height;
        (x, y)
    }
}
