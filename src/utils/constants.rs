/// Default number of decimal places kept on grid coordinates
pub const DEFAULT_COORDINATE_PRECISION: u32 = 5;
pub const MAX_COORDINATE_PRECISION: u32 = 12;

/// Band identifier defaults
pub const DEFAULT_IDENTIFIER_PREFIX: &str = "AgERA5";
pub const DEFAULT_IDENTIFIER_SUFFIX: &str = r"\d{8}(?:_.*)?";
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Raster file extensions picked up by the archive listing
pub const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// Partition layout
pub const PARTITION_COLUMN: &str = "date";
pub const PARTITION_FILE_NAME: &str = "part-00000.parquet";
pub const STAGING_PREFIX: &str = ".staging-";
pub const TRASH_PREFIX: &str = ".trash-";
pub const DEFAULT_DESTINATION_ROOT: &str = "output/partitions";

/// Column names
pub const COL_X: &str = "x";
pub const COL_Y: &str = "y";
pub const COL_DATE: &str = "date";
pub const COL_TEMPERATURE: &str = "temperature";
pub const COL_DEW_POINT: &str = "dew_point";
pub const COL_RELATIVE_HUMIDITY: &str = "relative_humidity";
pub const COL_TEMPERATURE_F: &str = "temperature_f";
pub const COL_HEAT_INDEX: &str = "heat_index";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 100_000;
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Magnus coefficients (Alduchov & Eskridge)
pub const MAGNUS_A: f64 = 17.625;
pub const MAGNUS_B: f64 = 243.04;

/// Heat index thresholds, degrees Fahrenheit / percent
pub const HEAT_INDEX_REGRESSION_THRESHOLD: f64 = 80.0;
pub const KELVIN_OFFSET: f64 = 273.15;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
