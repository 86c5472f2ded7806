//! Synthetic test images

use stippler_core::{PixelImage, Result};

/// Image filled with one colour
pub fn uniform(width: u32, height: u32, rgb: (u8, u8, u8)) -> Result<PixelImage> {
    let n = (width as usize) * (height as usize);
    PixelImage::from_rgb(width, height, vec![rgb.0; n], vec![rgb.1; n], vec![rgb.2; n])
}

/// Image of uniformly random colours
pub fn random(width: u32, height: u32) -> Result<PixelImage> {
    let n = (width as usize) * (height as usize);
    let bytes: Vec<u8> = (0..n * 3).map(|_| rand::random::<u8>()).collect();
    PixelImage::from_interleaved_rgb(width, height, &bytes)
}

/// A random 8-bit RGB triple
pub fn random_rgb() -> (u8, u8, u8) {
    (rand::random(), rand::random(), rand::random())
}

/// Image split into four solid quadrants, colours in raster order
/// (top-left, top-right, bottom-left, bottom-right)
pub fn quadrants(width: u32, height: u32, colors: [(u8, u8, u8); 4]) -> Result<PixelImage> {
    let mut bytes = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for y in 0..height {
        for x in 0..width {
            let q = (usize::from(y >= height / 2) << 1) | usize::from(x >= width / 2);
            let (r, g, b) = colors[q];
            bytes.extend_from_slice(&[r, g, b]);
        }
    }
    PixelImage::from_interleaved_rgb(width, height, &bytes)
}

/// Grey ramp from black on the left to white on the right
pub fn horizontal_ramp(width: u32, height: u32) -> Result<PixelImage> {
    let mut bytes = Vec::with_capacity((width as usize) * (height as usize) * 3);
    let span = width.saturating_sub(1).max(1) as f64;
    for _ in 0..height {
        for x in 0..width {
            let v = (x as f64 * 255.0 / span).round() as u8;
            bytes.extend_from_slice(&[v, v, v]);
        }
    }
    PixelImage::from_interleaved_rgb(width, height, &bytes)
}

/// Image from a lightness function of the pixel coordinates
pub fn lightness_map<F: Fn(u32, u32) -> f64>(width: u32, height: u32, f: F) -> Result<PixelImage> {
    let mut l = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
        for x in 0..width {
            l.push(f(x, y));
        }
    }
    PixelImage::from_lightness(width, height, l)
}
