use serde::{Deserialize, Serialize};

/// One long-format observation read from a raster band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub x: f64,
    pub y: f64,
    /// `YYYYMMDD`
    pub date: String,
    pub variable_name: String,
    /// `None` for nodata/NaN samples
    pub value: Option<f64>,
}

impl GridCell {
    pub fn new(x: f64, y: f64, date: String, variable_name: String, value: Option<f64>) -> Self {
        Self {
            x,
            y,
            date,
            variable_name,
            value,
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.x, self.y, &self.date)
    }
}

/// Composite `(x, y, date)` join key.
///
/// Coordinates are compared by bit pattern, which is exact once they have
/// gone through `round_coordinate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    x_bits: u64,
    y_bits: u64,
    date: String,
}

impl CellKey {
    pub fn new(x: f64, y: f64, date: &str) -> Self {
        Self {
            x_bits: x.to_bits(),
            y_bits: y.to_bits(),
            date: date.to_string(),
        }
    }

    pub fn x(&self) -> f64 {
        f64::from_bits(self.x_bits)
    }

    pub fn y(&self) -> f64 {
        f64::from_bits(self.y_bits)
    }

    pub fn date(&self) -> &str {
        &self.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::round_coordinate;

    #[test]
    fn test_keys_match_after_rounding() {
        let a = GridCell::new(
            round_coordinate(10.1 + 0.2, 5),
            round_coordinate(45.0, 5),
            "20200101".into(),
            "t".into(),
            Some(1.0),
        );
        let b = GridCell::new(
            round_coordinate(10.3, 5),
            round_coordinate(45.000000001, 5),
            "20200101".into(),
            "td".into(),
            None,
        );
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().x(), 10.3);
    }

    #[test]
    fn test_keys_differ_by_date() {
        let a = CellKey::new(1.0, 2.0, "20200101");
        let b = CellKey::new(1.0, 2.0, "20200102");
        assert_ne!(a, b);
        assert_eq!(b.date(), "20200102");
    }
}
