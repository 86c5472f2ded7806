//! Stippler Core - Image types and the incremental algorithm protocol
//!
//! This crate provides the building blocks shared by every stippler
//! algorithm:
//!
//! - [`PixelImage`] - RGB / L*a*b* image with lazily derived channels and
//!   neighbourhood queries
//! - [`Raster`] - Packed RGB output image
//! - [`colorspace`] - sRGB <-> CIE XYZ <-> CIE L*a*b* conversion (D65)
//! - [`IncrementalAlgorithm`] / [`AlgorithmState`] - Resumable, host-driven
//!   state machines and the [`run_to_completion`] driver

pub mod algorithm;
pub mod colorspace;
pub mod error;
pub mod image;
pub mod raster;

pub use algorithm::{
    AlgorithmState, Cancellable, IncrementalAlgorithm, ProgressSink, Step, run_to_completion,
    run_with_images,
};
pub use colorspace::{Lab, Xyz};
pub use error::{Error, Result};
pub use image::{Channel, ChannelData, LabPlanes, Neighbours, PixelImage, RgbPlanes, SobelGradient};
pub use raster::Raster;

/// Helpers for 32-bit RGBA pixels.
///
/// # Pixel format
///
/// 32-bit pixels are stored as `0xRRGGBBAA` (red in MSB, alpha in LSB).
pub mod color {
    /// Shift amounts for extracting color channels
    pub const RED_SHIFT: u32 = 24;
    pub const GREEN_SHIFT: u32 = 16;
    pub const BLUE_SHIFT: u32 = 8;
    pub const ALPHA_SHIFT: u32 = 0;

    pub const BLACK: u32 = compose_rgb(0, 0, 0);
    pub const WHITE: u32 = compose_rgb(255, 255, 255);
    pub const MID_GREY: u32 = compose_rgb(128, 128, 128);
    pub const RED: u32 = compose_rgb(255, 0, 0);
    pub const GREEN: u32 = compose_rgb(0, 255, 0);
    pub const BLUE: u32 = compose_rgb(0, 0, 255);
    pub const YELLOW: u32 = compose_rgb(255, 255, 0);

    /// Extract red component from a 32-bit pixel.
    #[inline]
    pub fn red(pixel: u32) -> u8 {
        ((pixel >> RED_SHIFT) & 0xff) as u8
    }

    /// Extract green component from a 32-bit pixel.
    #[inline]
    pub fn green(pixel: u32) -> u8 {
        ((pixel >> GREEN_SHIFT) & 0xff) as u8
    }

    /// Extract blue component from a 32-bit pixel.
    #[inline]
    pub fn blue(pixel: u32) -> u8 {
        ((pixel >> BLUE_SHIFT) & 0xff) as u8
    }

    /// Compose a 32-bit RGB pixel (alpha = 255).
    #[inline]
    pub const fn compose_rgb(r: u8, g: u8, b: u8) -> u32 {
        ((r as u32) << RED_SHIFT)
            | ((g as u32) << GREEN_SHIFT)
            | ((b as u32) << BLUE_SHIFT)
            | (255 << ALPHA_SHIFT)
    }

    /// Compose an opaque grey pixel.
    #[inline]
    pub const fn grey(v: u8) -> u32 {
        compose_rgb(v, v, v)
    }

    /// Extract RGB values from a 32-bit pixel.
    #[inline]
    pub fn extract_rgb(pixel: u32) -> (u8, u8, u8) {
        (red(pixel), green(pixel), blue(pixel))
    }
}
