pub mod columnar;
pub mod derived;
pub mod grid_cell;
pub mod joined;

pub use columnar::ColumnarRecord;
pub use derived::DerivedRow;
pub use grid_cell::{CellKey, GridCell};
pub use joined::JoinedRow;
