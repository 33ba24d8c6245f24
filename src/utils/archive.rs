use crate::config::DateRange;
use crate::error::{ProcessingError, Result};
use crate::utils::constants::RASTER_EXTENSIONS;
use crate::utils::identifier::extract_date;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A raster file whose name carries its date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedRaster {
    pub date: String,
    pub path: PathBuf,
}

/// List the raster files of one variable directory, filtered to `range` and
/// sorted by the date in their file names.
///
/// Files without a recognisable date are skipped with a warning; they
/// cannot be paired by position.
pub fn list_rasters(dir_path: &Path, range: Option<&DateRange>) -> Result<Vec<DatedRaster>> {
    if !dir_path.is_dir() {
        return Err(ProcessingError::Config(format!(
            "Path is not a directory: {}",
            dir_path.display()
        )));
    }

    let mut rasters = Vec::new();

    for entry in fs::read_dir(dir_path)? {
        let entry = entry?;
        let path = entry.path();

        let is_raster = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| RASTER_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if !path.is_file() || !is_raster {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match extract_date(file_name) {
            Some(date) => {
                if range.map_or(true, |r| r.contains(&date)) {
                    rasters.push(DatedRaster { date, path });
                }
            }
            None => warn!("Skipping {}: no date in file name", path.display()),
        }
    }

    rasters.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
    debug!("Listed {} rasters in {}", rasters.len(), dir_path.display());

    Ok(rasters)
}

/// Paths only, in listing order
pub fn paths(rasters: &[DatedRaster]) -> Vec<PathBuf> {
    rasters.iter().map(|r| r.path.clone()).collect()
}
