use crate::error::{ProcessingError, Result};
use crate::models::{CellKey, GridCell, JoinedRow};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Joined rows for exactly one date
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    pub date: String,
    pub rows: Vec<JoinedRow>,
}

impl JoinedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with both variables present
    pub fn complete_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.is_complete()).count()
    }
}

/// Joins a day's temperature cells with its dew-point cells.
///
/// The temperature table drives the join: every distinct temperature key
/// yields one row, in the order first seen, with `dew_point` left empty when
/// the dew-point table has no cell at that key. Duplicate keys in either
/// input keep their first occurrence. Both inputs must carry the same single
/// date.
#[derive(Debug, Default)]
pub struct PairJoiner;

impl PairJoiner {
    pub fn new() -> Self {
        Self
    }

    pub fn join(&self, temperature: &[GridCell], dewpoint: &[GridCell]) -> Result<JoinedTable> {
        let date = single_date(temperature)?;
        check_dewpoint_dates(&date, dewpoint)?;

        let mut dew_points: HashMap<CellKey, Option<f64>> = HashMap::with_capacity(dewpoint.len());
        let mut dew_duplicates = 0usize;
        for cell in dewpoint {
            if dew_points.contains_key(&cell.key()) {
                dew_duplicates += 1;
            } else {
                dew_points.insert(cell.key(), cell.value);
            }
        }

        let mut seen: HashSet<CellKey> = HashSet::with_capacity(temperature.len());
        let mut temp_duplicates = 0usize;
        let mut rows = Vec::with_capacity(temperature.len());
        for cell in temperature {
            let key = cell.key();
            if !seen.insert(key.clone()) {
                temp_duplicates += 1;
                continue;
            }
            let dew_point = dew_points.get(&key).copied().flatten();
            rows.push(JoinedRow::new(
                cell.x,
                cell.y,
                cell.date.clone(),
                cell.value,
                dew_point,
            ));
        }

        if temp_duplicates > 0 {
            warn!(
                "{} duplicate temperature cells for {}, kept first occurrence",
                temp_duplicates, date
            );
        }
        if dew_duplicates > 0 {
            warn!(
                "{} duplicate dew-point cells for {}, kept first occurrence",
                dew_duplicates, date
            );
        }

        Ok(JoinedTable { date, rows })
    }
}

fn single_date(cells: &[GridCell]) -> Result<String> {
    let dates: BTreeSet<&str> = cells.iter().map(|c| c.date.as_str()).collect();
    match dates.len() {
        0 => Err(ProcessingError::MissingData(
            "Temperature table is empty".to_string(),
        )),
        1 => Ok(dates.into_iter().next().unwrap_or_default().to_string()),
        _ => Err(ProcessingError::MultipleDates(
            dates.into_iter().map(str::to_string).collect(),
        )),
    }
}

/// Dew-point cells must all carry the temperature table's date
fn check_dewpoint_dates(date: &str, dewpoint: &[GridCell]) -> Result<()> {
    let mut dates: BTreeSet<&str> = dewpoint.iter().map(|c| c.date.as_str()).collect();
    if dates.iter().all(|d| *d == date) {
        return Ok(());
    }
    dates.insert(date);
    Err(ProcessingError::MultipleDates(
        dates.into_iter().map(str::to_string).collect(),
    ))
}
