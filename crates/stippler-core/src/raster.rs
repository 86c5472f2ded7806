//! Raster - packed RGB output image
//!
//! `Raster` is the image an algorithm hands back to its host. Pixels are
//! 32-bit `0xRRGGBBAA` words (see [`crate::color`]), stored row-major with
//! no padding.

use crate::color;
use crate::error::{Error, Result, pixel_count, try_alloc};

/// Packed 32-bit RGB image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl Raster {
    /// Create a raster with every pixel set to opaque black
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_filled(width, height, color::compose_rgb(0, 0, 0))
    }

    /// Create a raster with every pixel set to `pixel`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0 or the
    /// pixel count overflows, and `Error::AllocationFailed` if the buffer
    /// cannot be reserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use stippler_core::{Raster, color};
    ///
    /// let yellow = color::compose_rgb(255, 255, 0);
    /// let r = Raster::new_filled(3, 2, yellow).unwrap();
    /// assert_eq!(r.get_rgb(2, 1), Some((255, 255, 0)));
    /// ```
    pub fn new_filled(width: u32, height: u32, pixel: u32) -> Result<Self> {
        let data = try_alloc(pixel_count(width, height)?, pixel)?;
        Ok(Raster {
            width,
            height,
            data,
        })
    }

    /// Build a raster from interleaved 8-bit RGB bytes
    ///
    /// # Errors
    ///
    /// Returns `Error::DataLength` if `bytes.len() != width * height * 3`.
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let n = pixel_count(width, height)?;
        if bytes.len() != n * 3 {
            return Err(Error::DataLength {
                expected: n * 3,
                actual: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(3)
            .map(|p| color::compose_rgb(p[0], p[1], p[2]))
            .collect();
        Ok(Raster {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Packed pixels, row-major
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Get a packed pixel, or `None` if out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[(y as usize) * (self.width as usize) + x as usize])
    }

    /// Get the RGB components of a pixel, or `None` if out of bounds
    pub fn get_rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        self.get_pixel(x, y).map(color::extract_rgb)
    }

    /// Set a packed pixel
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if the coordinates are outside the
    /// raster.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: u32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * (self.width as usize) + x as usize,
                len: self.data.len(),
            });
        }
        self.data[(y as usize) * (self.width as usize) + x as usize] = pixel;
        Ok(())
    }

    /// Set a pixel from RGB components
    pub fn set_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) -> Result<()> {
        self.set_pixel(x, y, color::compose_rgb(r, g, b))
    }

    /// Set every pixel to `pixel`
    pub fn fill(&mut self, pixel: u32) {
        self.data.fill(pixel);
    }

    /// Interleaved 8-bit RGB bytes, row-major
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 3);
        for &p in &self.data {
            let (r, g, b) = color::extract_rgb(p);
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }
}
