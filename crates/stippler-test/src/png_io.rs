//! PNG reading and writing for regression output

use std::fs::File;
use std::io::{BufReader, BufWriter};

use png::{BitDepth, ColorType, Decoder, Encoder};
use stippler_core::Raster;

use crate::error::{TestError, TestResult};

/// Write a raster as an 8-bit RGB PNG
pub fn write_png(raster: &Raster, path: &str) -> TestResult<()> {
    let write_err = |e: png::EncodingError| TestError::PngEncode {
        path: path.to_string(),
        message: e.to_string(),
    };

    let file = File::create(path)?;
    let mut encoder = Encoder::new(BufWriter::new(file), raster.width(), raster.height());
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(write_err)?;
    writer
        .write_image_data(&raster.to_rgb_bytes())
        .map_err(write_err)?;
    Ok(())
}

/// Read an 8-bit RGB or RGBA PNG into a raster (alpha is dropped)
pub fn read_png(path: &str) -> TestResult<Raster> {
    let load_err = |message: String| TestError::PngDecode {
        path: path.to_string(),
        message,
    };

    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file));
    let mut reader = decoder.read_info().map_err(|e| load_err(e.to_string()))?;
    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| load_err("failed to get output buffer size".to_string()))?;
    let mut buf = vec![0; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| load_err(e.to_string()))?;

    if info.bit_depth != BitDepth::Eight {
        return Err(load_err(format!("unsupported bit depth {:?}", info.bit_depth)));
    }
    let bytes = &buf[..info.buffer_size()];
    let rgb: Vec<u8> = match info.color_type {
        ColorType::Rgb => bytes.to_vec(),
        ColorType::Rgba => bytes
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
        other => return Err(load_err(format!("unsupported color type {:?}", other))),
    };
    Ok(Raster::from_rgb_bytes(info.width, info.height, &rgb)?)
}
