//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Supports the georeferencing subset scarmap needs:
//! ModelPixelScale + ModelTiepoint for the affine transform, the
//! GeoKeyDirectory for an EPSG code, and the GDAL_NODATA ASCII tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32Float, Gray64Float, Gray8, GrayI32};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// On-disk sample type for written rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    UInt8,
    Int32,
    Float32,
    Float64,
}

impl SampleType {
    /// Natural on-disk type for a raster element type
    pub fn for_element<T: RasterElement>() -> Self {
        let size = std::mem::size_of::<T>();
        if T::is_float() {
            if size == 8 { SampleType::Float64 } else { SampleType::Float32 }
        } else if size == 1 && T::from_f64(-1.0).is_none() {
            SampleType::UInt8
        } else {
            SampleType::Int32
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Force an on-disk sample type; defaults to the element's natural type
    pub sample_type: Option<SampleType>,
}

/// Read a GeoTIFF file into a Raster
///
/// Only single-band rasters are supported; `band` other than 1 is rejected.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file, band)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), band)
}

fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    if let Some(b) = band
        && b != 1
    {
        return Err(Error::InvalidParameter {
            name: "band",
            value: b.to_string(),
            reason: "only single-band rasters are supported".to_string(),
        });
    }

    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata::<T, R>(&mut decoder));

    Ok(raster)
}

fn cast_all<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)).ok()?;
    if keys.len() < 4 {
        return None;
    }

    let count = keys[3] as usize;
    keys[4..]
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0)
        .find(|entry| {
            (entry[0] == PROJECTED_CS_TYPE_KEY || entry[0] == GEOGRAPHIC_TYPE_KEY)
                && entry[3] != USER_DEFINED
        })
        .map(|entry| CRS::from_epsg(entry[3] as u32))
}

fn read_nodata<T, R>(decoder: &mut Decoder<R>) -> Option<T>
where
    T: RasterElement,
    R: Read + Seek,
{
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim().trim_end_matches('\0').parse().ok()?;
    T::from_f64(value)
}

/// Write a Raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file, options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let tags = GeoTags::for_raster(raster);
    let sample_type = options.sample_type.unwrap_or(SampleType::for_element::<T>());

    match sample_type {
        SampleType::UInt8 => {
            let data: Vec<u8> = cast_out(raster, 0);
            write_image::<Gray8, W>(&mut encoder, raster.shape(), &data, &tags)
        }
        SampleType::Int32 => {
            let data: Vec<i32> = cast_out(raster, i32::MIN);
            write_image::<GrayI32, W>(&mut encoder, raster.shape(), &data, &tags)
        }
        SampleType::Float32 => {
            let data: Vec<f32> = cast_out(raster, f32::NAN);
            write_image::<Gray32Float, W>(&mut encoder, raster.shape(), &data, &tags)
        }
        SampleType::Float64 => {
            let data: Vec<f64> = cast_out(raster, f64::NAN);
            write_image::<Gray64Float, W>(&mut encoder, raster.shape(), &data, &tags)
        }
    }
}

fn cast_out<T, S>(raster: &Raster<T>, fallback: S) -> Vec<S>
where
    T: RasterElement,
    S: num_traits::NumCast + Copy,
{
    raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(fallback))
        .collect()
}

/// GeoTIFF tag payloads derived from a raster's metadata
struct GeoTags {
    scale: Vec<f64>,
    tiepoint: Vec<f64>,
    geokeys: Vec<u16>,
    nodata: Option<String>,
}

impl GeoTags {
    fn for_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        let gt = raster.transform();

        // Version 1.1.0; GTRasterTypeGeoKey = RasterPixelIsArea
        let mut entries: Vec<[u16; 4]> = Vec::new();
        let epsg = raster.crs().and_then(|c| c.epsg()).filter(|&c| c < u16::MAX as u32);
        match epsg {
            Some(code) if (4000..5000).contains(&code) => {
                entries.push([GT_MODEL_TYPE_KEY, 0, 1, 2]);
                entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
                entries.push([GEOGRAPHIC_TYPE_KEY, 0, 1, code as u16]);
            }
            Some(code) => {
                entries.push([GT_MODEL_TYPE_KEY, 0, 1, 1]);
                entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
                entries.push([PROJECTED_CS_TYPE_KEY, 0, 1, code as u16]);
            }
            None => {
                entries.push([GT_MODEL_TYPE_KEY, 0, 1, 1]);
                entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
            }
        }

        let mut geokeys = vec![1, 1, 0, entries.len() as u16];
        geokeys.extend(entries.iter().flatten());

        let nodata = raster
            .nodata()
            .and_then(|nd| nd.to_f64())
            .map(|nd| if nd.is_nan() { "nan".to_string() } else { nd.to_string() });

        Self {
            scale: vec![gt.pixel_width, gt.pixel_height.abs(), 0.0],
            tiepoint: vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0],
            geokeys,
            nodata,
        }
    }
}

fn write_image<C, W>(
    encoder: &mut TiffEncoder<W>,
    (rows, cols): (usize, usize),
    data: &[C::Inner],
    tags: &GeoTags,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder.new_image::<C>(cols as u32, rows as u32)?;

    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), tags.scale.as_slice())?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), tags.tiepoint.as_slice())?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), tags.geokeys.as_slice())?;
    if let Some(nodata) = &tags.nodata {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), nodata.as_str())?;
    }

    image.write_data(data)?;
    Ok(())
}
