use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::GridCell;
use crate::utils::coordinates::{round_coordinate, validate_precision, GridGeometry};
use crate::utils::identifier::{IdentifierParser, IdentifierPattern};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Reads one GeoTIFF into long-format [`GridCell`] rows.
///
/// Every page of the file is a band. The band identifier is taken from the
/// page's `ImageDescription` tag (or the file stem when the tag is absent)
/// and must yield both a date and a variable name.
pub struct GridReader {
    precision: u32,
    parser: IdentifierParser,
    use_mmap: bool,
}

impl GridReader {
    pub fn new(pattern: &IdentifierPattern, precision: u32) -> Result<Self> {
        validate_precision(precision)?;
        Ok(Self {
            precision,
            parser: pattern.compile()?,
            use_mmap: false,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(&config.identifier, config.coordinate_precision)?
            .with_mmap(config.use_mmap))
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Read every band of the raster at `path`
    pub fn read(&self, path: &Path) -> Result<Vec<GridCell>> {
        let file = File::open(path)?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let cells = if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            self.decode(Cursor::new(&mmap[..]), fallback)?
        } else {
            self.decode(BufReader::new(file), fallback)?
        };

        debug!("Read {} cells from {}", cells.len(), path.display());
        Ok(cells)
    }

    fn decode<R: Read + Seek>(&self, reader: R, fallback: &str) -> Result<Vec<GridCell>> {
        let mut decoder = Decoder::new(reader)?;
        let mut cells = Vec::new();
        let mut band = 0usize;

        loop {
            self.decode_band(&mut decoder, fallback, band, &mut cells)?;
            if !decoder.more_images() {
                break;
            }
            decoder.next_image()?;
            band += 1;
        }

        Ok(cells)
    }

    fn decode_band<R: Read + Seek>(
        &self,
        decoder: &mut Decoder<R>,
        fallback: &str,
        band: usize,
        cells: &mut Vec<GridCell>,
    ) -> Result<()> {
        let identifier = band_identifier(decoder)?.unwrap_or_else(|| fallback.to_string());
        let (date, variable_name) = self.parser.parse(&identifier)?;

        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(ProcessingError::Format(format!(
                    "Band {} has unsupported sample layout {:?}",
                    band, other
                )))
            }
        }

        let (width, height) = decoder.dimensions()?;
        let geometry = read_geometry(decoder)?;
        let nodata = read_nodata(decoder)?;
        let image = decoder.read_image()?;
        let single_precision = matches!(image, DecodingResult::F32(_));
        let samples = samples_to_f64(image)?;

        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(ProcessingError::Format(format!(
                "Band {} has {} samples, expected {}x{}",
                band,
                samples.len(),
                width,
                height
            )));
        }

        cells.reserve(expected);
        for row in 0..height {
            for col in 0..width {
                let raw = samples[row as usize * width as usize + col as usize];
                let value = if is_missing(raw, nodata, single_precision) {
                    None
                } else {
                    Some(raw)
                };
                let (x, y) = geometry.position(col, row);
                cells.push(GridCell::new(
                    round_coordinate(x, self.precision),
                    round_coordinate(y, self.precision),
                    date.clone(),
                    variable_name.clone(),
                    value,
                ));
            }
        }

        debug!(
            "Band {} '{}' for {}: {}x{} cells",
            band, variable_name, date, width, height
        );
        Ok(())
    }
}

fn band_identifier<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<String>> {
    let Some(value) = decoder.find_tag(Tag::ImageDescription)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_end_matches('\0').trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

fn read_geometry<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GridGeometry> {
    let pixel_is_point = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(value) => raster_type(&value.into_u16_vec()?) == Some(RASTER_PIXEL_IS_POINT),
        None => false,
    };

    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => GridGeometry::from_tags(
            &tiepoint.into_f64_vec()?,
            &scale.into_f64_vec()?,
            pixel_is_point,
        ),
        _ => match decoder.find_tag(Tag::ModelTransformationTag)? {
            Some(matrix) => {
                GridGeometry::from_transformation(&matrix.into_f64_vec()?, pixel_is_point)
            }
            None => Err(ProcessingError::Format(
                "Raster has no georeferencing tags".to_string(),
            )),
        },
    }
}

/// `GTRasterTypeGeoKey` from a GeoKey directory, if stored inline
fn raster_type(directory: &[u16]) -> Option<u16> {
    directory
        .get(4..)?
        .chunks_exact(4)
        .find(|entry| entry[0] == GT_RASTER_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3])
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_end_matches('\0').trim();
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| ProcessingError::Format(format!("Invalid GDAL_NODATA value '{}'", text)))
}

fn is_missing(raw: f64, nodata: Option<f64>, single_precision: bool) -> bool {
    if raw.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) if nd.is_nan() => false,
        // f32 rasters carry the nodata value at single precision
        Some(nd) if single_precision => raw == nd || raw as f32 == nd as f32,
        Some(nd) => raw == nd,
        None => false,
    }
}

fn samples_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    #[allow(unreachable_patterns)]
    let values = match result {
        DecodingResult::F64(v) => v,
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f64).collect(),
        _ => {
            return Err(ProcessingError::Format(
                "Unsupported raster sample type".to_string(),
            ))
        }
    };
    Ok(values)
}
