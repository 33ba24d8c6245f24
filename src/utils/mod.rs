pub mod archive;
pub mod constants;
pub mod coordinates;
pub mod identifier;
pub mod progress;

pub use archive::{list_rasters, DatedRaster};
pub use constants::*;
pub use coordinates::{round_coordinate, GridGeometry};
pub use identifier::{extract_date, IdentifierParser, IdentifierPattern};
pub use progress::ProgressReporter;
