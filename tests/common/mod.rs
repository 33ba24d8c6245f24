use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

pub const TEMPERATURE_PREFIX: &str = "AgERA5_Temperature-Air-2m-Mean-24h";
pub const DEWPOINT_PREFIX: &str = "AgERA5_Dew-Point-Temperature-2m-Mean";

/// Write a single-band north-up float32 GeoTIFF with GDAL nodata -9999
pub fn write_band(path: &Path, identifier: &str, width: u32, height: u32, values: &[f32]) {
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(width, height)
        .unwrap();

    let directory = image.encoder();
    directory.write_tag(Tag::ImageDescription, identifier).unwrap();
    directory
        .write_tag(Tag::ModelPixelScaleTag, &[0.1f64, 0.1, 0.0][..])
        .unwrap();
    directory
        .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 5.0, 52.0, 0.0][..])
        .unwrap();
    directory.write_tag(Tag::GdalNodata, "-9999").unwrap();
    image.write_data(values).unwrap();
}

/// Temperature and dew-point rasters for `date` on a 3x2 grid. The
/// temperature grid has no missing cells; the dew-point grid has one.
pub fn write_day(dir: &Path, date: &str, base: f32) -> (PathBuf, PathBuf) {
    let temperature = dir.join(format!("tmean_{}.tif", date));
    let dewpoint = dir.join(format!("tdew_{}.tif", date));

    let t: Vec<f32> = (0..6).map(|i| base + i as f32).collect();
    let mut d: Vec<f32> = (0..6).map(|i| base - 8.0 + i as f32).collect();
    d[4] = -9999.0;

    write_band(&temperature, &format!("{}_{}_final", TEMPERATURE_PREFIX, date), 3, 2, &t);
    write_band(&dewpoint, &format!("{}_{}", DEWPOINT_PREFIX, date), 3, 2, &d);
    (temperature, dewpoint)
}
