//! PixelImage - dual-representation pixel buffer
//!
//! A `PixelImage` owns one authoritative set of per-channel planes, either
//! 8-bit R/G/B or real-valued L*/a*/b*, and derives the other set on first
//! access. The derived set is computed for every pixel at once and cached.
//!
//! Pixel index `k` of `(x, y)` is `y * width + x`.
//!
//! # Neighbour order
//!
//! Neighbour queries use a fixed angular order, counter-clockwise from the
//! right with `y` growing downwards:
//!
//! - 4-neighbours: right, up, left, down
//! - 8-neighbours: right, up-right, up, up-left, left, down-left, down, down-right

use std::cell::OnceCell;

use crate::colorspace::{self, Lab};
use crate::error::{Error, Result, pixel_count};
use crate::raster::Raster;

/// 8-bit R, G, B planes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbPlanes {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
}

/// Real-valued L*, a*, b* planes
#[derive(Debug, Clone, PartialEq)]
pub struct LabPlanes {
    pub l: Vec<f64>,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl RgbPlanes {
    fn to_lab(&self) -> LabPlanes {
        let n = self.r.len();
        let mut lab = LabPlanes {
            l: Vec::with_capacity(n),
            a: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
        };
        for k in 0..n {
            let c = colorspace::rgb_to_lab(self.r[k], self.g[k], self.b[k]);
            lab.l.push(c.l);
            lab.a.push(c.a);
            lab.b.push(c.b);
        }
        lab
    }
}

impl LabPlanes {
    fn to_rgb(&self) -> RgbPlanes {
        let n = self.l.len();
        let mut rgb = RgbPlanes {
            r: Vec::with_capacity(n),
            g: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
        };
        for k in 0..n {
            let (r, g, b) = colorspace::lab_to_rgb(Lab::new(self.l[k], self.a[k], self.b[k]));
            rgb.r.push(r);
            rgb.g.push(g);
            rgb.b.push(b);
        }
        rgb
    }
}

/// Channel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    LStar,
    AStar,
    BStar,
}

/// Borrowed view of one channel plane
#[derive(Debug, Clone, Copy)]
pub enum ChannelData<'a> {
    /// An 8-bit RGB plane
    Rgb(&'a [u8]),
    /// A real-valued L*a*b* plane
    Lab(&'a [f64]),
}

/// Fixed-capacity list of neighbour indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbours<const N: usize> {
    indices: [usize; N],
    len: usize,
}

impl<const N: usize> Neighbours<N> {
    fn new() -> Self {
        Self {
            indices: [0; N],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, k: usize) {
        self.indices[self.len] = k;
        self.len += 1;
    }

    /// Number of valid neighbours
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.as_slice().iter().copied()
    }
}

/// Sobel gradient of the three L*a*b* channels at one pixel
///
/// Each entry is an `[gx, gy]` pair; `sum` is the vector sum of the three
/// channel gradients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SobelGradient {
    pub l: [f64; 2],
    pub a: [f64; 2],
    pub b: [f64; 2],
    pub sum: [f64; 2],
}

impl SobelGradient {
    /// Squared magnitude of the summed gradient
    #[inline]
    pub fn magnitude_squared(&self) -> f64 {
        self.sum[0] * self.sum[0] + self.sum[1] * self.sum[1]
    }
}

/// Image with lazily derived RGB / L*a*b* representations
#[derive(Debug, Clone)]
pub struct PixelImage {
    width: u32,
    height: u32,
    len: usize,
    rgb: OnceCell<RgbPlanes>,
    lab: OnceCell<LabPlanes>,
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::DataLength { expected, actual });
    }
    Ok(())
}

impl PixelImage {
    /// Create an image from separate R, G, B planes
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` for empty or oversized images and
    /// `Error::DataLength` if a plane does not hold `width * height` values.
    pub fn from_rgb(width: u32, height: u32, r: Vec<u8>, g: Vec<u8>, b: Vec<u8>) -> Result<Self> {
        let len = pixel_count(width, height)?;
        check_len(len, r.len())?;
        check_len(len, g.len())?;
        check_len(len, b.len())?;
        Ok(Self {
            width,
            height,
            len,
            rgb: OnceCell::from(RgbPlanes { r, g, b }),
            lab: OnceCell::new(),
        })
    }

    /// Create an image from interleaved 8-bit RGB bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use stippler_core::PixelImage;
    ///
    /// let img = PixelImage::from_interleaved_rgb(2, 1, &[255, 0, 0, 0, 0, 255]).unwrap();
    /// assert_eq!(img.rgb_at(1, 0), Some((0, 0, 255)));
    /// ```
    pub fn from_interleaved_rgb(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let len = pixel_count(width, height)?;
        check_len(len * 3, bytes.len())?;
        let mut r = Vec::with_capacity(len);
        let mut g = Vec::with_capacity(len);
        let mut b = Vec::with_capacity(len);
        for p in bytes.chunks_exact(3) {
            r.push(p[0]);
            g.push(p[1]);
            b.push(p[2]);
        }
        Self::from_rgb(width, height, r, g, b)
    }

    /// Create an image from a packed raster
    pub fn from_raster(raster: &Raster) -> Result<Self> {
        Self::from_interleaved_rgb(raster.width(), raster.height(), &raster.to_rgb_bytes())
    }

    /// Create an image from L*, a*, b* planes
    ///
    /// # Errors
    ///
    /// Same as [`PixelImage::from_rgb`].
    pub fn from_lab(width: u32, height: u32, l: Vec<f64>, a: Vec<f64>, b: Vec<f64>) -> Result<Self> {
        let len = pixel_count(width, height)?;
        check_len(len, l.len())?;
        check_len(len, a.len())?;
        check_len(len, b.len())?;
        Ok(Self {
            width,
            height,
            len,
            rgb: OnceCell::new(),
            lab: OnceCell::from(LabPlanes { l, a, b }),
        })
    }

    /// Create a neutral image from a lightness plane alone (a* = b* = 0)
    pub fn from_lightness(width: u32, height: u32, l: Vec<f64>) -> Result<Self> {
        let n = l.len();
        Self::from_lab(width, height, l, vec![0.0; n], vec![0.0; n])
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

    /// Number of pixels, `width * height`
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.len
    }

    /// Pixel index of `(x, y)`; the caller guarantees the coordinates are valid
    #[inline]
    pub fn xy_to_index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Coordinates of pixel index `k`
    #[inline]
    pub fn index_to_xy(&self, k: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((k % w) as u32, (k / w) as u32)
    }

    /// Whether signed coordinates fall inside the image
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// RGB planes, converting from L*a*b* on first use
    pub fn rgb(&self) -> &RgbPlanes {
        self.rgb.get_or_init(|| {
            tracing::debug!(width = self.width, height = self.height, "deriving RGB planes");
            match self.lab.get() {
                Some(lab) => lab.to_rgb(),
                None => RgbPlanes {
                    r: vec![0; self.len],
                    g: vec![0; self.len],
                    b: vec![0; self.len],
                },
            }
        })
    }

    /// L*a*b* planes, converting from RGB on first use
    pub fn lab(&self) -> &LabPlanes {
        self.lab.get_or_init(|| {
            tracing::debug!(width = self.width, height = self.height, "deriving L*a*b* planes");
            match self.rgb.get() {
                Some(rgb) => rgb.to_lab(),
                None => LabPlanes {
                    l: vec![0.0; self.len],
                    a: vec![0.0; self.len],
                    b: vec![0.0; self.len],
                },
            }
        })
    }

    /// Whether the L*a*b* planes have been computed
    pub fn has_lab(&self) -> bool {
        self.lab.get().is_some()
    }

    /// Whether the RGB planes have been computed
    pub fn has_rgb(&self) -> bool {
        self.rgb.get().is_some()
    }

    /// Borrow one channel plane, deriving its colour space if needed
    pub fn channel(&self, which: Channel) -> ChannelData<'_> {
        match which {
            Channel::Red => ChannelData::Rgb(&self.rgb().r),
            Channel::Green => ChannelData::Rgb(&self.rgb().g),
            Channel::Blue => ChannelData::Rgb(&self.rgb().b),
            Channel::LStar => ChannelData::Lab(&self.lab().l),
            Channel::AStar => ChannelData::Lab(&self.lab().a),
            Channel::BStar => ChannelData::Lab(&self.lab().b),
        }
    }

    /// RGB value at `(x, y)`, or `None` if out of bounds
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.rgb_at_index(self.xy_to_index(x, y))
    }

    /// RGB value at pixel index `k`, or `None` if out of bounds
    pub fn rgb_at_index(&self, k: usize) -> Option<(u8, u8, u8)> {
        if k >= self.len {
            return None;
        }
        let rgb = self.rgb();
        Some((rgb.r[k], rgb.g[k], rgb.b[k]))
    }

    /// L*a*b* value at `(x, y)`, or `None` if out of bounds
    pub fn lab_at(&self, x: u32, y: u32) -> Option<Lab> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.lab_at_index(self.xy_to_index(x, y))
    }

    /// L*a*b* value at pixel index `k`, or `None` if out of bounds
    pub fn lab_at_index(&self, k: usize) -> Option<Lab> {
        if k >= self.len {
            return None;
        }
        let lab = self.lab();
        Some(Lab::new(lab.l[k], lab.a[k], lab.b[k]))
    }

    /// In-image 4-neighbours of `k` (right, up, left, down)
    pub fn four_neighbours(&self, k: usize) -> Neighbours<4> {
        let mut n = Neighbours::new();
        if k >= self.len {
            return n;
        }
        let w = self.width as usize;
        let (x, y) = self.index_to_xy(k);
        if x + 1 < self.width {
            n.push(k + 1);
        }
        if y > 0 {
            n.push(k - w);
        }
        if x > 0 {
            n.push(k - 1);
        }
        if y + 1 < self.height {
            n.push(k + w);
        }
        n
    }

    /// In-image 8-neighbours of `k`, counter-clockwise from the right
    pub fn eight_neighbours(&self, k: usize) -> Neighbours<8> {
        let mut n = Neighbours::new();
        if k >= self.len {
            return n;
        }
        let (x, y) = self.index_to_xy(k);
        for (dx, dy) in EIGHT_OFFSETS {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if self.contains(nx, ny) {
                n.push(self.xy_to_index(nx as u32, ny as u32));
            }
        }
        n
    }

    /// All eight neighbours of `k`, with the index of `k` itself standing in
    /// for every neighbour outside the image
    ///
    /// `k` must be a valid pixel index.
    pub fn eight_neighbours_replicate(&self, k: usize) -> [usize; 8] {
        debug_assert!(k < self.len);
        let (x, y) = self.index_to_xy(k);
        let mut out = [k; 8];
        for (slot, (dx, dy)) in out.iter_mut().zip(EIGHT_OFFSETS) {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if self.contains(nx, ny) {
                *slot = self.xy_to_index(nx as u32, ny as u32);
            }
        }
        out
    }

    /// Pixels of `[cx-dx, cx+dx] x [cy-dy, cy+dy]` clipped to the image,
    /// row-major, written into `out` (cleared first)
    pub fn rectangular_neighbourhood(&self, cx: i64, cy: i64, dx: i64, dy: i64, out: &mut Vec<usize>) {
        out.clear();
        let x0 = (cx - dx).max(0);
        let x1 = (cx + dx).min(self.width as i64 - 1);
        let y0 = (cy - dy).max(0);
        let y1 = (cy + dy).min(self.height as i64 - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }
        for y in y0..=y1 {
            let row = (y as usize) * (self.width as usize);
            out.extend((x0 as usize..=x1 as usize).map(|x| row + x));
        }
    }

    /// Sobel gradient of L*, a* and b* at pixel `k`, replicating the centre
    /// pixel across the image border
    ///
    /// Returns `None` if `k` is out of bounds.
    pub fn sobel_gradient(&self, k: usize) -> Option<SobelGradient> {
        if k >= self.len {
            return None;
        }
        let n = self.eight_neighbours_replicate(k);
        let lab = self.lab();
        let l = sobel(&lab.l, &n);
        let a = sobel(&lab.a, &n);
        let b = sobel(&lab.b, &n);
        Some(SobelGradient {
            l,
            a,
            b,
            sum: [l[0] + a[0] + b[0], l[1] + a[1] + b[1]],
        })
    }

    /// Render the RGB view as a packed raster
    pub fn to_raster(&self) -> Result<Raster> {
        let rgb = self.rgb();
        let mut bytes = Vec::with_capacity(self.len * 3);
        for k in 0..self.len {
            bytes.extend_from_slice(&[rgb.r[k], rgb.g[k], rgb.b[k]]);
        }
        Raster::from_rgb_bytes(self.width, self.height, &bytes)
    }
}

/// Offsets for right, up-right, up, up-left, left, down-left, down, down-right
const EIGHT_OFFSETS: [(i64, i64); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[inline]
fn sobel(plane: &[f64], n: &[usize; 8]) -> [f64; 2] {
    let v = |i: usize| plane[n[i]];
    let gx = -2.0 * v(0) - v(1) + v(3) + 2.0 * v(4) + v(5) - v(7);
    let gy = v(1) + 2.0 * v(2) + v(3) - v(5) - 2.0 * v(6) - v(7);
    [gx, gy]
}
