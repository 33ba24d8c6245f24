//! GeoTIFF fixtures shared by the unit tests.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

pub struct Band<'a> {
    pub description: Option<&'a str>,
    pub values: Vec<f32>,
}

impl<'a> Band<'a> {
    pub fn new(description: Option<&'a str>, values: Vec<f32>) -> Self {
        Self {
            description,
            values,
        }
    }
}

/// Write a north-up float32 GeoTIFF whose upper-left corner is `origin`
pub fn write_geotiff(
    path: &Path,
    width: u32,
    height: u32,
    origin: (f64, f64),
    pixel_size: f64,
    nodata: Option<&str>,
    bands: &[Band],
) {
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = TiffEncoder::new(file).unwrap();

    for band in bands {
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(width, height)
            .unwrap();
        let directory = image.encoder();
        if let Some(description) = band.description {
            directory
                .write_tag(Tag::ImageDescription, description)
                .unwrap();
        }
        directory
            .write_tag(Tag::ModelPixelScaleTag, &[pixel_size, pixel_size, 0.0][..])
            .unwrap();
        directory
            .write_tag(
                Tag::ModelTiepointTag,
                &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..],
            )
            .unwrap();
        // version 1.1.0, one key: GTRasterTypeGeoKey = PixelIsArea
        directory
            .write_tag(Tag::GeoKeyDirectoryTag, &[1u16, 1, 0, 1, 1025, 0, 1, 1][..])
            .unwrap();
        if let Some(nodata) = nodata {
            directory.write_tag(Tag::GdalNodata, nodata).unwrap();
        }
        image.write_data(&band.values).unwrap();
    }
}
